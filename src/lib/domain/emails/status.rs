//! Email lifecycle status

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where an email is in its delivery lifecycle
///
/// ```text
/// Pending -> Queued -> Processing -> Sent
///              ^            |
///              |            +-> Failed -> Queued (retry)
///              |            +-> DeadLettered
///              +-- (reschedule) Queued
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmailStatus {
    /// Created, not yet queued
    Pending,

    /// Waiting in the queue, possibly for a future schedule
    Queued,

    /// Claimed by a processing loop
    Processing,

    /// Delivered
    Sent,

    /// The last attempt failed and the email will be retried
    Failed,

    /// Retries are exhausted
    DeadLettered,
}

impl EmailStatus {
    /// Whether no further transition is possible
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Sent | Self::DeadLettered)
    }

    /// Whether moving from `self` to `next` follows the lifecycle
    pub fn can_transition_to(self, next: EmailStatus) -> bool {
        use EmailStatus::*;

        matches!(
            (self, next),
            (Pending, Queued)
                | (Queued, Queued)
                | (Queued, Processing)
                | (Processing, Sent)
                | (Processing, Failed)
                | (Processing, DeadLettered)
                | (Failed, Queued)
        )
    }
}

impl fmt::Display for EmailStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "Pending",
            Self::Queued => "Queued",
            Self::Processing => "Processing",
            Self::Sent => "Sent",
            Self::Failed => "Failed",
            Self::DeadLettered => "DeadLettered",
        };

        f.write_str(name)
    }
}
