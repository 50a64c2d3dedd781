//! The processing loop: pulls queued emails and drives them through delivery

use std::sync::Arc;

use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::domain::{
    communication::mailer::Mailer,
    emails::{
        EmailMessage, EmailMetrics, EmailQueueConsumer, EmailQueueProducer, EmailStatus,
        EmailStatusStore,
    },
    time::Clock,
};

use super::{ProcessingError, ProcessingOptions};

/// What a single iteration of the loop did
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// The queue was empty
    Idle,

    /// The email is scheduled for later and went back to the queue without a delivery attempt
    Rescheduled(Uuid),

    /// The email was delivered
    Sent(Uuid),

    /// Delivery failed and the email went back to the queue
    Retrying {
        /// The email
        id: Uuid,

        /// Its retry count after this failure
        retry_count: u32,
    },

    /// Delivery failed with no retries left
    DeadLettered(Uuid),
}

/// Drains the delivery queue one email at a time
#[derive(Debug, Clone)]
pub struct EmailProcessor<C, P, S, T, M, K>
where
    C: EmailQueueConsumer,
    P: EmailQueueProducer,
    S: EmailStatusStore,
    T: Mailer,
    M: EmailMetrics,
    K: Clock,
{
    consumer: Arc<C>,
    producer: Arc<P>,
    store: Arc<S>,
    mailer: Arc<T>,
    metrics: Arc<M>,
    clock: Arc<K>,
    options: ProcessingOptions,
}

impl<C, P, S, T, M, K> EmailProcessor<C, P, S, T, M, K>
where
    C: EmailQueueConsumer,
    P: EmailQueueProducer,
    S: EmailStatusStore,
    T: Mailer,
    M: EmailMetrics,
    K: Clock,
{
    /// Create a new email processor
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        consumer: Arc<C>,
        producer: Arc<P>,
        store: Arc<S>,
        mailer: Arc<T>,
        metrics: Arc<M>,
        clock: Arc<K>,
        options: ProcessingOptions,
    ) -> Self {
        Self {
            consumer,
            producer,
            store,
            mailer,
            metrics,
            clock,
            options,
        }
    }

    /// Runs the loop until `cancel` is triggered.
    ///
    /// Infrastructure errors are logged and followed by a back-off; they never end the loop.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(
            max_retry_attempts = self.options.max_retry_attempts,
            "email processor started"
        );

        while !cancel.is_cancelled() {
            let wait = match self.process_next(&cancel).await {
                Ok(ProcessOutcome::Idle) => self.options.poll_interval,
                Ok(_) => continue,
                Err(err) => {
                    error!(error = %err, "email processing failed, backing off");

                    self.options.error_backoff
                }
            };

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = sleep(wait) => {}
            }
        }

        info!("email processor stopped");
    }

    /// Pulls one email and advances it.
    ///
    /// A scheduled email that is not due yet is held for the remaining delay, capped at the
    /// reschedule ceiling, then published again. Cancelling `cancel` cuts that wait short but the
    /// email is still published. Delivery itself is never interrupted.
    pub async fn process_next(
        &self,
        cancel: &CancellationToken,
    ) -> Result<ProcessOutcome, ProcessingError> {
        let Some(email) = self.consumer.pull().await? else {
            return Ok(ProcessOutcome::Idle);
        };

        debug!(
            email_id = %email.id(),
            status = %email.status(),
            retry_count = email.retry_count(),
            "pulled email"
        );

        if !email.should_process(self.clock.now()) {
            return self.reschedule(email, cancel).await;
        }

        self.deliver(email).await
    }

    async fn reschedule(
        &self,
        email: EmailMessage,
        cancel: &CancellationToken,
    ) -> Result<ProcessOutcome, ProcessingError> {
        let now = self.clock.now();
        let delay = email
            .scheduled_for()
            .and_then(|scheduled_for| (scheduled_for - now).to_std().ok())
            .unwrap_or_default()
            .min(self.options.reschedule_ceiling);

        debug!(
            email_id = %email.id(),
            scheduled_for = ?email.scheduled_for(),
            ?delay,
            "email not due, holding"
        );

        tokio::select! {
            _ = cancel.cancelled() => debug!(email_id = %email.id(), "hold cut short by shutdown"),
            _ = sleep(delay) => {}
        }

        let email = email.mark_queued();

        self.producer.publish(&email).await?;
        self.store
            .update_status(&email.id(), EmailStatus::Queued, None)
            .await?;

        info!(
            email_id = %email.id(),
            scheduled_for = ?email.scheduled_for(),
            "email rescheduled"
        );

        Ok(ProcessOutcome::Rescheduled(email.id()))
    }

    async fn deliver(&self, email: EmailMessage) -> Result<ProcessOutcome, ProcessingError> {
        let id = email.id();
        let started = Instant::now();

        let email = email.mark_processing();

        self.store
            .update_status(&id, EmailStatus::Processing, None)
            .await?;

        match self.mailer.send_email(&email).await {
            Ok(()) => {
                let email = email.mark_sent();

                self.store.update_status(&id, EmailStatus::Sent, None).await?;
                self.metrics.on_processed(started.elapsed(), true);

                info!(email_id = %id, retry_count = email.retry_count(), "email sent");

                Ok(ProcessOutcome::Sent(id))
            }
            Err(err) => {
                let reason = err.to_string();
                let can_retry = email.retry_count() < self.options.max_retry_attempts;
                let email = email.mark_failed(reason.as_str(), can_retry);

                self.store
                    .update_status(&id, email.status(), Some(reason.clone()))
                    .await?;
                self.metrics.on_processed(started.elapsed(), false);
                self.metrics.on_failure(&reason);

                if !can_retry {
                    error!(
                        email_id = %id,
                        retry_count = email.retry_count(),
                        reason = %reason,
                        "email dead-lettered"
                    );

                    return Ok(ProcessOutcome::DeadLettered(id));
                }

                warn!(
                    email_id = %id,
                    retry_count = email.retry_count(),
                    reason = %reason,
                    "email delivery failed, retrying"
                );

                let email = email.mark_queued();

                self.producer.publish(&email).await?;
                self.store
                    .update_status(&id, EmailStatus::Queued, None)
                    .await?;

                Ok(ProcessOutcome::Retrying {
                    id,
                    retry_count: email.retry_count(),
                })
            }
        }
    }
}
