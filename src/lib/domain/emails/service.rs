//! Email submission service module

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};
use uuid::Uuid;

#[cfg(test)]
use mockall::mock;

use crate::domain::{communication::templates::TemplateRenderer, time::Clock};

use super::{
    errors::{GetEmailError, SendEmailError, ValidationError, ValidationFailure},
    EmailMessage, EmailMetrics, EmailQueueProducer, EmailStatus, EmailStatusStore,
    SendEmailCommand,
};

/// The outcome of a successful submission
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EmailReceipt {
    /// The id assigned to the email
    pub id: Uuid,

    /// The status the email had when the submission returned
    pub status: EmailStatus,
}

/// Email service
#[async_trait]
pub trait EmailService: Clone + Send + Sync + 'static {
    /// Validates a command and queues the resulting email for delivery.
    ///
    /// # Arguments
    /// * `command` - A reference to a [`SendEmailCommand`].
    ///
    /// # Returns
    /// A [`Result`] which is [`Ok`] containing an [`EmailReceipt`] once the email is stored and
    /// published, or an [`Err`] containing a [`SendEmailError`]. Nothing is stored or published
    /// when validation or template rendering fails.
    async fn send_email(&self, command: &SendEmailCommand) -> Result<EmailReceipt, SendEmailError>;

    /// Retrieves an email by its ID.
    ///
    /// # Arguments
    /// * `id` - The UUID of the email to retrieve.
    ///
    /// # Returns
    /// A [`Result`] which is [`Ok`] containing the current [`EmailMessage`],
    /// or an [`Err`] containing a [`GetEmailError`] if it cannot be found.
    async fn get_email(&self, id: &Uuid) -> Result<EmailMessage, GetEmailError>;
}

#[cfg(test)]
mock! {
    pub EmailService {}

    impl Clone for EmailService {
        fn clone(&self) -> Self;
    }

    #[async_trait]
    impl EmailService for EmailService {
        async fn send_email(&self, command: &SendEmailCommand) -> Result<EmailReceipt, SendEmailError>;
        async fn get_email(&self, id: &Uuid) -> Result<EmailMessage, GetEmailError>;
    }
}

/// Email service implementation
#[derive(Debug, Clone)]
pub struct EmailServiceImpl<S, Q, M, T, C>
where
    S: EmailStatusStore,
    Q: EmailQueueProducer,
    M: EmailMetrics,
    T: TemplateRenderer,
    C: Clock,
{
    store: Arc<S>,
    producer: Arc<Q>,
    metrics: Arc<M>,
    templates: Arc<T>,
    clock: Arc<C>,
}

impl<S, Q, M, T, C> EmailServiceImpl<S, Q, M, T, C>
where
    S: EmailStatusStore,
    Q: EmailQueueProducer,
    M: EmailMetrics,
    T: TemplateRenderer,
    C: Clock,
{
    /// Create a new email service
    pub fn new(
        store: Arc<S>,
        producer: Arc<Q>,
        metrics: Arc<M>,
        templates: Arc<T>,
        clock: Arc<C>,
    ) -> Self {
        Self {
            store,
            producer,
            metrics,
            templates,
            clock,
        }
    }
}

#[async_trait]
impl<S, Q, M, T, C> EmailService for EmailServiceImpl<S, Q, M, T, C>
where
    S: EmailStatusStore,
    Q: EmailQueueProducer,
    M: EmailMetrics,
    T: TemplateRenderer,
    C: Clock,
{
    async fn send_email(&self, command: &SendEmailCommand) -> Result<EmailReceipt, SendEmailError> {
        command.validate()?;

        let rendered = match command.template_id() {
            Some(template_id) => {
                debug!(template_id, "rendering email template");

                Some(
                    self.templates
                        .render(template_id, &command.template_data)
                        .await?,
                )
            }
            None => None,
        };

        let draft = command.to_draft(rendered.as_deref())?;

        let email = EmailMessage::create(draft, self.clock.now())
            .map_err(|err| ValidationError(vec![ValidationFailure::new("to", err.to_string())]))?;

        let email = self.store.add(email).await?;

        self.producer.publish(&email).await?;
        self.metrics.on_queued();

        info!(
            email_id = %email.id(),
            scheduled_for = ?email.scheduled_for(),
            "email queued"
        );

        Ok(EmailReceipt {
            id: email.id(),
            status: email.status(),
        })
    }

    async fn get_email(&self, id: &Uuid) -> Result<EmailMessage, GetEmailError> {
        Ok(self.store.get(id).await?)
    }
}
