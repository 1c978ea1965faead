use chrono::{DateTime, Utc};

/**
 * Source of the current time for every publish/close decision
 */
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/**
 * Wall clock of the host
 */
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
pub use fixed::FixedClock;
