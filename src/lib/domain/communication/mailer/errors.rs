//! Mailer errors

use thiserror::Error;

/// Mailer errors
#[derive(Debug, Error)]
pub enum MailerError {
    /// The mail system rejected or failed to accept the email
    #[error("An error occurred while sending the email: {0}")]
    SendError(String),

    /// Invalid email address
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    /// The email could not be turned into a deliverable message
    #[error("Invalid email: {0}")]
    InvalidMessage(String),

    /// Unknown error
    #[error(transparent)]
    UnknownError(anyhow::Error),
}

impl From<anyhow::Error> for MailerError {
    fn from(err: anyhow::Error) -> Self {
        MailerError::UnknownError(err)
    }
}
