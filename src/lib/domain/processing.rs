//! Background delivery of queued emails

mod errors;
mod options;
mod processor;

pub use errors::ProcessingError;
pub use options::ProcessingOptions;
pub use processor::{EmailProcessor, ProcessOutcome};
