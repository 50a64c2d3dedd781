//! Time source

use chrono::{DateTime, Utc};

#[cfg(test)]
use mockall::mock;

/// Supplies the current time, so scheduling decisions can be tested deterministically
pub trait Clock: Clone + Send + Sync + 'static {
    /// The current time in UTC
    fn now(&self) -> DateTime<Utc>;
}

#[cfg(test)]
mock! {
    pub Clock {}

    impl Clone for Clock {
        fn clone(&self) -> Self;
    }

    impl Clock for Clock {
        fn now(&self) -> DateTime<Utc>;
    }
}
