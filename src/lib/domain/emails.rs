//! This module contains the email message aggregate and its related collaborators.

mod attachment;
mod command;
mod content;
mod message;
mod metadata;
mod metrics;
mod queue;
mod recipient;
mod service;
mod status;
mod status_store;

pub mod errors;

pub use attachment::{Attachment, AttachmentSource};
pub use command::{AttachmentInput, RecipientInput, SendEmailCommand, MAX_SUBJECT_LENGTH};
pub use content::EmailContent;
pub use message::{EmailDraft, EmailMessage, EmailSnapshot, UNKNOWN_FAILURE_REASON};
pub use metadata::Metadata;
pub use metrics::EmailMetrics;
pub use queue::{EmailQueueConsumer, EmailQueueProducer};
pub use recipient::Recipient;
pub use service::{EmailReceipt, EmailService, EmailServiceImpl};
pub use status::EmailStatus;
pub use status_store::EmailStatusStore;
