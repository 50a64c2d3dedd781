//! Volatile, process-local status store

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::emails::{
    errors::StatusStoreError, EmailMessage, EmailStatus, EmailStatusStore,
};

/// Status store backed by a concurrent map
///
/// Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEmailStatusStore {
    emails: Arc<DashMap<Uuid, EmailMessage>>,
}

impl InMemoryEmailStatusStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored emails
    pub fn len(&self) -> usize {
        self.emails.len()
    }

    /// Whether no email is stored
    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }
}

#[async_trait]
impl EmailStatusStore for InMemoryEmailStatusStore {
    async fn add(&self, email: EmailMessage) -> Result<EmailMessage, StatusStoreError> {
        let email = email.mark_queued();

        self.emails.insert(email.id(), email.clone());

        Ok(email)
    }

    async fn update_status(
        &self,
        id: &Uuid,
        status: EmailStatus,
        reason: Option<String>,
    ) -> Result<(), StatusStoreError> {
        let Some(mut entry) = self.emails.get_mut(id) else {
            debug!(email_id = %id, %status, "status update for unknown email ignored");

            return Ok(());
        };

        let current = entry.value().clone();

        if !current.status().can_transition_to(status) {
            warn!(
                email_id = %id,
                from = %current.status(),
                to = %status,
                "unexpected status transition"
            );
        }

        *entry.value_mut() = current.transition(status, reason.as_deref());

        Ok(())
    }

    async fn get(&self, id: &Uuid) -> Result<EmailMessage, StatusStoreError> {
        self.emails
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or(StatusStoreError::EmailNotFound(*id))
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::domain::emails::{tests::email, UNKNOWN_FAILURE_REASON};

    use super::*;

    #[tokio::test]
    async fn test_add_marks_queued() -> TestResult {
        let store = InMemoryEmailStatusStore::new();

        let stored = store.add(email()).await?;

        assert_eq!(stored.status(), EmailStatus::Queued);
        assert_eq!(store.get(&stored.id()).await?.status(), EmailStatus::Queued);
        assert_eq!(store.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_update_status_applies_transitions() -> TestResult {
        let store = InMemoryEmailStatusStore::new();
        let id = store.add(email()).await?.id();

        store
            .update_status(&id, EmailStatus::Processing, None)
            .await?;
        store
            .update_status(&id, EmailStatus::Failed, Some("timeout".to_string()))
            .await?;

        let failed = store.get(&id).await?;

        assert_eq!(failed.status(), EmailStatus::Failed);
        assert_eq!(failed.retry_count(), 1);
        assert_eq!(failed.failure_reason(), Some("timeout"));

        store.update_status(&id, EmailStatus::Queued, None).await?;
        store
            .update_status(&id, EmailStatus::Processing, None)
            .await?;
        store.update_status(&id, EmailStatus::Sent, None).await?;

        let sent = store.get(&id).await?;

        assert_eq!(sent.status(), EmailStatus::Sent);
        assert_eq!(sent.retry_count(), 1);
        assert_eq!(sent.failure_reason(), None);

        Ok(())
    }

    #[tokio::test]
    async fn test_dead_letter_without_reason_keeps_retry_count() -> TestResult {
        let store = InMemoryEmailStatusStore::new();
        let id = store.add(email()).await?.id();

        store
            .update_status(&id, EmailStatus::Processing, None)
            .await?;
        store
            .update_status(&id, EmailStatus::DeadLettered, None)
            .await?;

        let dead = store.get(&id).await?;

        assert_eq!(dead.status(), EmailStatus::DeadLettered);
        assert_eq!(dead.retry_count(), 0);
        assert_eq!(dead.failure_reason(), Some(UNKNOWN_FAILURE_REASON));

        Ok(())
    }

    #[tokio::test]
    async fn test_unexpected_transition_is_still_applied() -> TestResult {
        let store = InMemoryEmailStatusStore::new();
        let id = store.add(email()).await?.id();

        store.update_status(&id, EmailStatus::Sent, None).await?;

        assert_eq!(store.get(&id).await?.status(), EmailStatus::Sent);

        Ok(())
    }

    #[tokio::test]
    async fn test_update_unknown_email_is_a_no_op() -> TestResult {
        let store = InMemoryEmailStatusStore::new();

        store
            .update_status(&Uuid::now_v7(), EmailStatus::Sent, None)
            .await?;

        assert!(store.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_get_unknown_email() {
        let store = InMemoryEmailStatusStore::new();
        let id = Uuid::now_v7();

        let result = store.get(&id).await;

        assert!(matches!(result, Err(StatusStoreError::EmailNotFound(missing)) if missing == id));
    }
}
