//! Processing loop configuration

use std::time::Duration;

use clap::Parser;

use crate::domain::processing::ProcessingOptions;

/// Processing loop configuration
#[derive(Debug, Clone, PartialEq, Eq, Parser)]
pub struct ProcessingConfig {
    /// Failed deliveries are retried while the retry count is below this
    #[arg(long, env = "EMAIL_MAX_RETRY_ATTEMPTS", default_value = "3")]
    pub max_retry_attempts: u32,

    /// Milliseconds between pulls when the queue is empty
    #[arg(long, env = "EMAIL_POLL_INTERVAL_MS", default_value = "1000")]
    pub poll_interval_ms: u64,

    /// Longest, in seconds, a scheduled email holds the loop before being re-queued
    #[arg(long, env = "EMAIL_RESCHEDULE_CEILING_SECS", default_value = "300")]
    pub reschedule_ceiling_secs: u64,

    /// Milliseconds to back off after an infrastructure error
    #[arg(long, env = "EMAIL_ERROR_BACKOFF_MS", default_value = "5000")]
    pub error_backoff_ms: u64,
}

impl From<&ProcessingConfig> for ProcessingOptions {
    fn from(config: &ProcessingConfig) -> Self {
        Self {
            max_retry_attempts: config.max_retry_attempts,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            reschedule_ceiling: Duration::from_secs(config.reschedule_ceiling_secs),
            error_backoff: Duration::from_millis(config.error_backoff_ms),
        }
    }
}
