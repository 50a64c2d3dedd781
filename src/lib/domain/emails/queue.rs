//! Email queue module

use async_trait::async_trait;

#[cfg(test)]
use mockall::mock;

use super::{errors::QueueError, EmailMessage};

/// The producing side of the delivery queue
///
/// Every publish is an independent entry, including re-publishes of an email that was already
/// pulled once.
#[async_trait]
pub trait EmailQueueProducer: Clone + Send + Sync + 'static {
    /// Serializes and appends an email to the queue.
    async fn publish(&self, email: &EmailMessage) -> Result<(), QueueError>;
}

/// The consuming side of the delivery queue
#[async_trait]
pub trait EmailQueueConsumer: Clone + Send + Sync + 'static {
    /// Removes and returns one email if one is available.
    ///
    /// Never waits for an email to arrive; callers decide how often to poll.
    async fn pull(&self) -> Result<Option<EmailMessage>, QueueError>;
}

#[cfg(test)]
mock! {
    pub EmailQueueProducer {}

    impl Clone for EmailQueueProducer {
        fn clone(&self) -> Self;
    }

    #[async_trait]
    impl EmailQueueProducer for EmailQueueProducer {
        async fn publish(&self, email: &EmailMessage) -> Result<(), QueueError>;
    }
}

#[cfg(test)]
mock! {
    pub EmailQueueConsumer {}

    impl Clone for EmailQueueConsumer {
        fn clone(&self) -> Self;
    }

    #[async_trait]
    impl EmailQueueConsumer for EmailQueueConsumer {
        async fn pull(&self) -> Result<Option<EmailMessage>, QueueError>;
    }
}
