//! Email status store module

use async_trait::async_trait;
use uuid::Uuid;

#[cfg(test)]
use mockall::mock;

use super::{errors::StatusStoreError, EmailMessage, EmailStatus};

/// The authoritative lookup of each email's current lifecycle state
///
/// Implementations must tolerate concurrent callers. Updates to one id are applied in the
/// order they are issued.
#[async_trait]
pub trait EmailStatusStore: Clone + Send + Sync + 'static {
    /// Stores an email, marking it [`EmailStatus::Queued`].
    ///
    /// # Returns
    /// The stored, queued copy of the email.
    async fn add(&self, email: EmailMessage) -> Result<EmailMessage, StatusStoreError>;

    /// Applies the transition for `status` to the stored email.
    ///
    /// Does nothing when no email with `id` is stored.
    async fn update_status(
        &self,
        id: &Uuid,
        status: EmailStatus,
        reason: Option<String>,
    ) -> Result<(), StatusStoreError>;

    /// Retrieves the current snapshot of an email.
    ///
    /// # Returns
    /// The email, or [`StatusStoreError::EmailNotFound`] if it is not stored.
    async fn get(&self, id: &Uuid) -> Result<EmailMessage, StatusStoreError>;
}

#[cfg(test)]
mock! {
    pub EmailStatusStore {}

    impl Clone for EmailStatusStore {
        fn clone(&self) -> Self;
    }

    #[async_trait]
    impl EmailStatusStore for EmailStatusStore {
        async fn add(&self, email: EmailMessage) -> Result<EmailMessage, StatusStoreError>;
        async fn update_status(&self, id: &Uuid, status: EmailStatus, reason: Option<String>) -> Result<(), StatusStoreError>;
        async fn get(&self, id: &Uuid) -> Result<EmailMessage, StatusStoreError>;
    }
}
