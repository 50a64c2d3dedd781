//! Email content

use super::errors::EmailContentError;

/// Subject and body of an email
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmailContent {
    subject: String,
    body: String,
    is_html: bool,
}

impl EmailContent {
    /// Create new content. The subject is trimmed, the body is kept verbatim.
    pub fn new(subject: &str, body: &str, is_html: bool) -> Result<Self, EmailContentError> {
        let subject = subject.trim();

        if subject.is_empty() {
            return Err(EmailContentError::EmptySubject);
        }

        if body.trim().is_empty() {
            return Err(EmailContentError::EmptyBody);
        }

        Ok(Self {
            subject: subject.to_string(),
            body: body.to_string(),
            is_html,
        })
    }

    /// The subject line
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// The body
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Whether the body is HTML rather than plain text
    pub fn is_html(&self) -> bool {
        self.is_html
    }
}
