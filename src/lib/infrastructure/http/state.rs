//! Application state module

use std::{fmt, sync::Arc};

use chrono::{DateTime, Utc};

use crate::{
    domain::emails::EmailService,
    infrastructure::{health::Readiness, metrics::EmailMetricsRecorder},
};

/// Global application state
#[derive(Clone)]
pub struct AppState<E: EmailService> {
    /// The time the server started
    pub start_time: DateTime<Utc>,

    /// Email service
    pub emails: Arc<E>,

    /// Counters exposed on the metrics endpoint
    pub metrics: EmailMetricsRecorder,

    /// Dependencies checked by the readiness endpoint
    pub readiness: Readiness,
}

/// Implementation of the application state
impl<E> AppState<E>
where
    E: EmailService,
{
    /// Create a new application state
    pub fn new(emails: E, metrics: EmailMetricsRecorder, readiness: Readiness) -> Self {
        Self {
            start_time: Utc::now(),
            emails: Arc::new(emails),
            metrics,
            readiness,
        }
    }
}

impl<E> fmt::Debug for AppState<E>
where
    E: EmailService,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("start_time", &self.start_time)
            .field("emails", &"EmailService")
            .field("metrics", &self.metrics)
            .field("readiness", &self.readiness)
            .finish()
    }
}
