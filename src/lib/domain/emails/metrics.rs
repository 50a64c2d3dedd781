//! Email metrics observer

use std::time::Duration;

#[cfg(test)]
use mockall::mock;

/// Receives observations from the submission path and the processing loop
pub trait EmailMetrics: Clone + Send + Sync + 'static {
    /// An email was accepted and queued
    fn on_queued(&self);

    /// A delivery attempt finished after `duration`
    fn on_processed(&self, duration: Duration, success: bool);

    /// A delivery attempt failed with `reason`
    fn on_failure(&self, reason: &str);
}

#[cfg(test)]
mock! {
    pub EmailMetrics {}

    impl Clone for EmailMetrics {
        fn clone(&self) -> Self;
    }

    impl EmailMetrics for EmailMetrics {
        fn on_queued(&self);
        fn on_processed(&self, duration: Duration, success: bool);
        fn on_failure(&self, reason: &str);
    }
}
