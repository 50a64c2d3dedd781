use thiserror::Error;

use crate::domain::emails::errors::{QueueError, StatusStoreError};

/// Infrastructure errors the processing loop absorbs and backs off from
#[derive(Debug, Error)]
pub enum ProcessingError {
    /// The queue could not be pulled from or published to
    #[error("queue error: {0}")]
    Queue(#[from] QueueError),

    /// The status store could not be updated
    #[error("status store error: {0}")]
    StatusStore(#[from] StatusStoreError),
}
