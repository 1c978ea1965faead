use handlebars::Handlebars;
use log::*;
use tide::sessions::SessionMiddleware;

use std::sync::Arc;

mod api_models;
mod clock;
mod config;
mod dao;
mod error;
mod identity;
mod models;
mod policy;
mod routes;
mod views;
mod voting;

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::dao::{PgStore, Store};

/**
 * Struct for carrying application state into tide request handlers
 */
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub clock: Arc<dyn Clock>,
    pub views: Arc<Handlebars<'static>>,
    pub admin_token: Option<String>,
}

/**
 * Assemble the tide application with its routes and session handling
 */
pub fn build_app(state: AppState, session_secret: &[u8]) -> tide::Server<AppState> {
    let mut app = tide::with_state(state);
    app.with(SessionMiddleware::new(
        tide::sessions::MemoryStore::new(),
        session_secret,
    ));

    app.at("/").get(routes::polls::index);
    app.at("/polls").get(routes::polls::index);
    app.at("/polls/:id").get(routes::polls::detail);
    app.at("/polls/:id/results").get(routes::polls::results);
    app.at("/polls/:id/vote").post(routes::polls::vote);

    app.at("/accounts/login")
        .get(routes::accounts::login_form)
        .post(routes::accounts::login);
    app.at("/accounts/logout").get(routes::accounts::logout);

    app.at("/api/v1/questions")
        .get(routes::api::list)
        .put(routes::api::create);
    app.at("/api/v1/questions/:id/results").get(routes::api::results);
    app
}

#[async_std::main]
async fn main() -> Result<(), std::io::Error> {
    pretty_env_logger::init();

    let config = match Config::load() {
        Ok(config) => config,
        Err(err) => {
            error!("Invalid configuration: {}", err);
            return Err(std::io::Error::new(std::io::ErrorKind::Other, err));
        }
    };

    let views = match views::load(&config.templates_dir) {
        Ok(views) => views,
        Err(err) => {
            error!("Could not load templates from {}: {:?}", config.templates_dir, err);
            return Err(std::io::Error::new(std::io::ErrorKind::Other, err.to_string()));
        }
    };

    let store = match PgStore::connect(&config.database_url, config.pool_size).await {
        Ok(store) => store,
        Err(err) => {
            error!("Could not initialize pool! {:?}", err);
            return Err(std::io::Error::new(std::io::ErrorKind::Other, err));
        }
    };

    if let Err(err) = store.migrate().await {
        error!("Could not migrate the database! {:?}", err);
        return Err(std::io::Error::new(std::io::ErrorKind::Other, err));
    }

    let state = AppState {
        store: Arc::new(store),
        clock: Arc::new(SystemClock),
        views: Arc::new(views),
        admin_token: config.admin_token.clone(),
    };

    let app = build_app(state, config.session_secret.as_bytes());
    info!("Listening on {}", config.listen_addr);
    app.listen(config.listen_addr).await?;
    Ok(())
}
