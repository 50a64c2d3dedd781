//! Mail transport module

mod errors;

use async_trait::async_trait;

#[cfg(test)]
use mockall::mock;

use crate::domain::emails::EmailMessage;

pub use errors::MailerError;

/// Hands emails to an outbound mail system
#[async_trait]
pub trait Mailer: Clone + Send + Sync + 'static {
    /// Attempt to deliver an email
    ///
    /// # Arguments
    /// * `email` - The [`EmailMessage`] to deliver, with its recipients, content and attachments.
    ///
    /// # Returns
    /// [`Ok`] once the mail system accepted the email, or a [`MailerError`] whose text describes
    /// why it did not.
    async fn send_email(&self, email: &EmailMessage) -> Result<(), MailerError>;
}

#[cfg(test)]
mock! {
    pub Mailer {}

    impl Clone for Mailer {
        fn clone(&self) -> Self;
    }

    #[async_trait]
    impl Mailer for Mailer {
        async fn send_email(&self, email: &EmailMessage) -> Result<(), MailerError>;
    }
}
