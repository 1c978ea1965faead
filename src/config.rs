use dotenv::dotenv;
use log::*;

use std::env;
use std::fmt::Display;
use std::str::FromStr;

use crate::error::ConfigError;

/**
 * Minimum length the session middleware accepts for its signing key
 */
const MIN_SECRET_LEN: usize = 32;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub listen_addr: String,
    pub pool_size: u32,
    pub session_secret: String,
    /**
     * The admin API is disabled when no token is configured
     */
    pub admin_token: Option<String>,
    pub templates_dir: String,
}

impl Config {
    /**
     * Read the configuration from the environment, honoring a `.env` file if one exists
     */
    pub fn load() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let session_secret =
            lookup("SESSION_SECRET").ok_or(ConfigError::Missing("SESSION_SECRET"))?;

        if session_secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::Invalid {
                key: "SESSION_SECRET",
                reason: format!("must be at least {} bytes", MIN_SECRET_LEN),
            });
        }

        Ok(Self {
            database_url,
            listen_addr: lookup("LISTEN_ADDR").unwrap_or_else(|| "127.0.0.1:8000".into()),
            pool_size: parse_or(&lookup, "DB_POOL_SIZE", 5)?,
            session_secret,
            admin_token: lookup("ADMIN_TOKEN").filter(|t| !t.trim().is_empty()),
            templates_dir: lookup("TEMPLATES_DIR").unwrap_or_else(|| "views".into()),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Display,
    T::Err: Display,
{
    match lookup(key) {
        None => {
            debug!("{} not set, using default: {}", key, default);
            Ok(default)
        }
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
        }),
    }
}
