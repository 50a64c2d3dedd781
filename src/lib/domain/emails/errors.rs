//! Error types for email messages, submission and the stores they pass through

use std::fmt;

use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::domain::communication::{
    email_addresses::EmailAddressError, templates::TemplateError,
};

/// Errors that can occur when creating a recipient
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecipientError {
    /// The recipient's display name is blank
    #[error("recipient name is required")]
    EmptyName,

    /// The recipient's address is invalid
    #[error(transparent)]
    InvalidAddress(#[from] EmailAddressError),
}

/// Errors that can occur when creating email content
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EmailContentError {
    /// The subject is blank
    #[error("subject is required")]
    EmptySubject,

    /// The body is blank
    #[error("body is required")]
    EmptyBody,
}

/// Errors that can occur when creating an attachment
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AttachmentError {
    /// The file name is blank
    #[error("attachment file name is required")]
    EmptyFileName,

    /// The content type is blank
    #[error("attachment content type is required")]
    EmptyContentType,

    /// Inline content was given but it is empty
    #[error("attachment content is required")]
    EmptyContent,

    /// The link is not an absolute URL
    #[error("attachment URL \"{0}\" is invalid")]
    InvalidUrl(String),
}

/// Errors that can occur when building metadata
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MetadataError {
    /// A key was empty or whitespace only
    #[error("metadata keys cannot be empty")]
    EmptyKey,
}

/// Errors that can occur when creating or restoring an email message
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EmailMessageError {
    /// No primary recipient was given
    #[error("at least one recipient is required")]
    NoRecipients,
}

/// A single failed validation rule
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationFailure {
    /// The offending field, e.g. `to[0].address`
    pub field: String,

    /// What is wrong with it
    pub message: String,
}

impl ValidationFailure {
    /// Create a new validation failure
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Every failed rule of a rejected send command
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{}", join_failures(.0))]
pub struct ValidationError(pub Vec<ValidationFailure>);

fn join_failures(failures: &[ValidationFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationError {
    /// The individual failures
    pub fn failures(&self) -> &[ValidationFailure] {
        &self.0
    }
}

/// Errors raised by a status store
#[derive(Debug, Error)]
pub enum StatusStoreError {
    /// No email with the given id is stored
    #[error("email with id \"{0}\" not found")]
    EmailNotFound(Uuid),

    /// Unknown error
    #[error(transparent)]
    UnknownError(#[from] anyhow::Error),
}

/// Errors raised by a queue producer or consumer
#[derive(Debug, Error)]
pub enum QueueError {
    /// A payload could not be encoded or decoded
    #[error("invalid queue payload: {0}")]
    InvalidPayload(String),

    /// Unknown error
    #[error(transparent)]
    UnknownError(#[from] anyhow::Error),
}

/// Errors that can occur when submitting an email
#[derive(Debug, Error)]
pub enum SendEmailError {
    /// The command was rejected
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The requested template could not be rendered
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// Unknown error
    #[error(transparent)]
    UnknownError(#[from] anyhow::Error),
}

/// Errors that can occur when looking up an email
#[derive(Debug, Error)]
pub enum GetEmailError {
    /// No email with the given id was submitted
    #[error("email with id \"{0}\" not found")]
    NotFound(Uuid),

    /// Unknown error
    #[error(transparent)]
    UnknownError(#[from] anyhow::Error),
}

impl From<StatusStoreError> for GetEmailError {
    fn from(err: StatusStoreError) -> Self {
        debug!("StatusStoreError -> GetEmailError");

        match err {
            StatusStoreError::EmailNotFound(id) => GetEmailError::NotFound(id),
            StatusStoreError::UnknownError(err) => GetEmailError::UnknownError(err),
        }
    }
}

impl From<StatusStoreError> for SendEmailError {
    fn from(err: StatusStoreError) -> Self {
        debug!("StatusStoreError -> SendEmailError");

        SendEmailError::UnknownError(err.into())
    }
}

impl From<QueueError> for SendEmailError {
    fn from(err: QueueError) -> Self {
        debug!("QueueError -> SendEmailError");

        SendEmailError::UnknownError(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_lists_every_failure() {
        let error = ValidationError(vec![
            ValidationFailure::new("subject", "subject is required"),
            ValidationFailure::new("to", "at least one recipient is required"),
        ]);

        assert_eq!(
            error.to_string(),
            "subject: subject is required; to: at least one recipient is required"
        );
    }

    #[test]
    fn test_store_error_becomes_unknown_send_error() {
        let id = Uuid::now_v7();

        let error = SendEmailError::from(StatusStoreError::EmailNotFound(id));

        assert!(matches!(error, SendEmailError::UnknownError(_)));
        assert_eq!(error.to_string(), format!("email with id \"{id}\" not found"));
    }
}
