//! In-process FIFO queue

use std::{collections::VecDeque, sync::Arc};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::trace;

use crate::domain::emails::{
    errors::QueueError, EmailMessage, EmailQueueConsumer, EmailQueueProducer,
};

use super::payload::{decode, encode};

/// Queue of encoded payloads held in memory
///
/// Clones share the same queue, so one clone can be handed to the submission path and another
/// to the processing loop.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEmailQueue {
    entries: Arc<Mutex<VecDeque<String>>>,
}

impl InMemoryEmailQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of waiting entries
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Whether no entry is waiting
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[async_trait]
impl EmailQueueProducer for InMemoryEmailQueue {
    async fn publish(&self, email: &EmailMessage) -> Result<(), QueueError> {
        let payload = encode(email)?;

        self.entries.lock().await.push_back(payload);

        trace!(email_id = %email.id(), "published email");

        Ok(())
    }
}

#[async_trait]
impl EmailQueueConsumer for InMemoryEmailQueue {
    async fn pull(&self) -> Result<Option<EmailMessage>, QueueError> {
        let Some(payload) = self.entries.lock().await.pop_front() else {
            return Ok(None);
        };

        decode(&payload).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::domain::emails::tests::email;

    use super::*;

    #[tokio::test]
    async fn test_pull_from_empty_queue() -> TestResult {
        let queue = InMemoryEmailQueue::new();

        assert!(queue.pull().await?.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_entries_are_pulled_in_publish_order() -> TestResult {
        let queue = InMemoryEmailQueue::new();
        let first = email().mark_queued();
        let second = email().mark_queued();

        queue.publish(&first).await?;
        queue.publish(&second).await?;

        assert_eq!(queue.len().await, 2);
        assert_eq!(queue.pull().await?, Some(first));
        assert_eq!(queue.pull().await?, Some(second));
        assert!(queue.is_empty().await);

        Ok(())
    }

    #[tokio::test]
    async fn test_republished_email_is_a_new_entry() -> TestResult {
        let queue = InMemoryEmailQueue::new();
        let email = email().mark_queued();

        queue.publish(&email).await?;
        queue.publish(&email).await?;

        assert_eq!(queue.len().await, 2);

        Ok(())
    }

    #[tokio::test]
    async fn test_clones_share_entries() -> TestResult {
        let producer = InMemoryEmailQueue::new();
        let consumer = producer.clone();
        let email = email().mark_queued();

        producer.publish(&email).await?;

        assert_eq!(consumer.pull().await?.map(|e| e.id()), Some(email.id()));

        Ok(())
    }
}
