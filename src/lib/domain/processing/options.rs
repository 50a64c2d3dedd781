use std::time::Duration;

/// Tuning of the processing loop
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProcessingOptions {
    /// Failed deliveries are retried while the retry count is below this
    pub max_retry_attempts: u32,

    /// Wait between pulls when the queue is empty
    pub poll_interval: Duration,

    /// Longest a single scheduled email holds the loop before being re-queued
    pub reschedule_ceiling: Duration,

    /// Wait after an infrastructure error
    pub error_backoff: Duration,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            max_retry_attempts: 3,
            poll_interval: Duration::from_secs(1),
            reschedule_ceiling: Duration::from_secs(300),
            error_backoff: Duration::from_secs(5),
        }
    }
}
