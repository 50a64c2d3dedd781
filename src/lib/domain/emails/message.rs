//! Email message aggregate

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{
    errors::EmailMessageError, Attachment, EmailContent, EmailStatus, Metadata, Recipient,
};

/// Failure reason recorded when a transport gives none
pub const UNKNOWN_FAILURE_REASON: &str = "unknown error";

/// Everything needed to create a new email
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmailDraft {
    /// Subject and body
    pub content: EmailContent,

    /// Primary recipients, at least one
    pub recipients: Vec<Recipient>,

    /// Carbon-copy recipients
    pub cc_recipients: Vec<Recipient>,

    /// Blind-copy recipients
    pub bcc_recipients: Vec<Recipient>,

    /// Attached files and links
    pub attachments: Vec<Attachment>,

    /// Caller-supplied metadata
    pub metadata: Metadata,

    /// Do not deliver before this time
    pub scheduled_for: Option<DateTime<Utc>>,
}

impl EmailDraft {
    /// Create a draft with no copies, attachments, metadata or schedule
    pub fn new(content: EmailContent, recipients: Vec<Recipient>) -> Self {
        Self {
            content,
            recipients,
            cc_recipients: Vec::new(),
            bcc_recipients: Vec::new(),
            attachments: Vec::new(),
            metadata: Metadata::new(),
            scheduled_for: None,
        }
    }
}

/// Every field of a stored or transported email, used to rebuild one
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmailSnapshot {
    /// Email id
    pub id: Uuid,

    /// Subject and body
    pub content: EmailContent,

    /// Primary recipients
    pub recipients: Vec<Recipient>,

    /// Carbon-copy recipients
    pub cc_recipients: Vec<Recipient>,

    /// Blind-copy recipients
    pub bcc_recipients: Vec<Recipient>,

    /// Attached files and links
    pub attachments: Vec<Attachment>,

    /// Caller-supplied metadata
    pub metadata: Metadata,

    /// Lifecycle status
    pub status: EmailStatus,

    /// Number of retryable failures so far
    pub retry_count: u32,

    /// Creation time in UTC
    pub created_at: DateTime<Utc>,

    /// Do not deliver before this time
    pub scheduled_for: Option<DateTime<Utc>>,

    /// Reason for the last failure
    pub failure_reason: Option<String>,
}

/// An email and its delivery lifecycle
///
/// Content, recipients, attachments and metadata are fixed at creation. Only the status,
/// retry count and failure reason change afterwards, through the `mark_*` transitions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmailMessage {
    id: Uuid,
    content: EmailContent,
    recipients: Vec<Recipient>,
    cc_recipients: Vec<Recipient>,
    bcc_recipients: Vec<Recipient>,
    attachments: Vec<Attachment>,
    metadata: Metadata,
    status: EmailStatus,
    retry_count: u32,
    created_at: DateTime<Utc>,
    scheduled_for: Option<DateTime<Utc>>,
    failure_reason: Option<String>,
}

impl EmailMessage {
    /// Create a new, pending email
    ///
    /// # Errors
    /// [`EmailMessageError::NoRecipients`] when the draft has no primary recipient.
    pub fn create(draft: EmailDraft, created_at: DateTime<Utc>) -> Result<Self, EmailMessageError> {
        if draft.recipients.is_empty() {
            return Err(EmailMessageError::NoRecipients);
        }

        Ok(Self {
            id: Uuid::now_v7(),
            content: draft.content,
            recipients: draft.recipients,
            cc_recipients: draft.cc_recipients,
            bcc_recipients: draft.bcc_recipients,
            attachments: draft.attachments,
            metadata: draft.metadata,
            status: EmailStatus::Pending,
            retry_count: 0,
            created_at,
            scheduled_for: draft.scheduled_for,
            failure_reason: None,
        })
    }

    /// Rebuild an email exactly as it was, status included
    pub fn restore(snapshot: EmailSnapshot) -> Result<Self, EmailMessageError> {
        if snapshot.recipients.is_empty() {
            return Err(EmailMessageError::NoRecipients);
        }

        Ok(Self {
            id: snapshot.id,
            content: snapshot.content,
            recipients: snapshot.recipients,
            cc_recipients: snapshot.cc_recipients,
            bcc_recipients: snapshot.bcc_recipients,
            attachments: snapshot.attachments,
            metadata: snapshot.metadata,
            status: snapshot.status,
            retry_count: snapshot.retry_count,
            created_at: snapshot.created_at,
            scheduled_for: snapshot.scheduled_for,
            failure_reason: snapshot.failure_reason,
        })
    }

    /// Copy every field out, e.g. for serialization
    pub fn to_snapshot(&self) -> EmailSnapshot {
        EmailSnapshot {
            id: self.id,
            content: self.content.clone(),
            recipients: self.recipients.clone(),
            cc_recipients: self.cc_recipients.clone(),
            bcc_recipients: self.bcc_recipients.clone(),
            attachments: self.attachments.clone(),
            metadata: self.metadata.clone(),
            status: self.status,
            retry_count: self.retry_count,
            created_at: self.created_at,
            scheduled_for: self.scheduled_for,
            failure_reason: self.failure_reason.clone(),
        }
    }

    /// The email's id
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Subject and body
    pub fn content(&self) -> &EmailContent {
        &self.content
    }

    /// Primary recipients
    pub fn recipients(&self) -> &[Recipient] {
        &self.recipients
    }

    /// Carbon-copy recipients
    pub fn cc_recipients(&self) -> &[Recipient] {
        &self.cc_recipients
    }

    /// Blind-copy recipients
    pub fn bcc_recipients(&self) -> &[Recipient] {
        &self.bcc_recipients
    }

    /// Attached files and links
    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    /// Caller-supplied metadata
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Lifecycle status
    pub fn status(&self) -> EmailStatus {
        self.status
    }

    /// Number of retryable failures so far
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Creation time
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Earliest delivery time, if scheduled
    pub fn scheduled_for(&self) -> Option<DateTime<Utc>> {
        self.scheduled_for
    }

    /// Reason for the last failure, cleared once sent
    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    /// Whether the email may be delivered at `now`
    pub fn should_process(&self, now: DateTime<Utc>) -> bool {
        self.scheduled_for
            .map_or(true, |scheduled_for| scheduled_for <= now)
    }

    /// Mark as waiting in the queue
    #[must_use]
    pub fn mark_queued(mut self) -> Self {
        self.status = EmailStatus::Queued;
        self
    }

    /// Mark as claimed for delivery
    #[must_use]
    pub fn mark_processing(mut self) -> Self {
        self.status = EmailStatus::Processing;
        self
    }

    /// Mark as delivered, clearing any previous failure reason
    #[must_use]
    pub fn mark_sent(mut self) -> Self {
        self.status = EmailStatus::Sent;
        self.failure_reason = None;
        self
    }

    /// Record a failed delivery
    ///
    /// When `can_retry` is true the email becomes [`EmailStatus::Failed`] and its retry count
    /// goes up by one; otherwise it becomes [`EmailStatus::DeadLettered`] and the count is kept.
    #[must_use]
    pub fn mark_failed(mut self, reason: impl Into<String>, can_retry: bool) -> Self {
        self.failure_reason = Some(reason.into());

        if can_retry {
            self.status = EmailStatus::Failed;
            self.retry_count += 1;
        } else {
            self.status = EmailStatus::DeadLettered;
        }

        self
    }

    /// Apply the transition matching `status`
    ///
    /// [`EmailStatus::Failed`] and [`EmailStatus::DeadLettered`] record `reason`, falling back to
    /// [`UNKNOWN_FAILURE_REASON`]. [`EmailStatus::Pending`] cannot be re-entered and leaves the
    /// email unchanged.
    #[must_use]
    pub fn transition(self, status: EmailStatus, reason: Option<&str>) -> Self {
        match status {
            EmailStatus::Pending => self,
            EmailStatus::Queued => self.mark_queued(),
            EmailStatus::Processing => self.mark_processing(),
            EmailStatus::Sent => self.mark_sent(),
            EmailStatus::Failed | EmailStatus::DeadLettered => self.mark_failed(
                reason.unwrap_or(UNKNOWN_FAILURE_REASON),
                status == EmailStatus::Failed,
            ),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::Duration;
    use testresult::TestResult;

    use crate::domain::emails::errors::EmailMessageError;

    use super::*;

    pub(crate) fn draft() -> EmailDraft {
        EmailDraft::new(
            EmailContent::new("Welcome", "<p>Hello</p>", true).expect("valid content"),
            vec![Recipient::new("Ada", "ada@example.com").expect("valid recipient")],
        )
    }

    pub(crate) fn email() -> EmailMessage {
        EmailMessage::create(draft(), Utc::now()).expect("valid email")
    }

    #[test]
    fn test_create_requires_a_recipient() {
        let mut draft = draft();
        draft.recipients.clear();

        let result = EmailMessage::create(draft, Utc::now());

        assert_eq!(result, Err(EmailMessageError::NoRecipients));
    }

    #[test]
    fn test_create_starts_pending_without_retries() -> TestResult {
        let created_at = Utc::now();

        let email = EmailMessage::create(draft(), created_at)?;

        assert_eq!(email.status(), EmailStatus::Pending);
        assert_eq!(email.retry_count(), 0);
        assert_eq!(email.created_at(), created_at);
        assert!(email.failure_reason().is_none());

        Ok(())
    }

    #[test]
    fn test_create_assigns_distinct_ids() -> TestResult {
        let first = EmailMessage::create(draft(), Utc::now())?;
        let second = EmailMessage::create(draft(), Utc::now())?;

        assert_ne!(first.id(), second.id());

        Ok(())
    }

    #[test]
    fn test_retryable_failure_increments_retry_count() {
        let email = email().mark_failed("mailbox full", true);

        assert_eq!(email.status(), EmailStatus::Failed);
        assert_eq!(email.retry_count(), 1);
        assert_eq!(email.failure_reason(), Some("mailbox full"));
    }

    #[test]
    fn test_final_failure_dead_letters_without_incrementing() {
        let email = email()
            .mark_failed("mailbox full", true)
            .mark_failed("mailbox still full", false);

        assert_eq!(email.status(), EmailStatus::DeadLettered);
        assert_eq!(email.retry_count(), 1);
        assert_eq!(email.failure_reason(), Some("mailbox still full"));
    }

    #[test]
    fn test_mark_sent_clears_failure_reason() {
        let email = email().mark_failed("timeout", true).mark_sent();

        assert_eq!(email.status(), EmailStatus::Sent);
        assert!(email.failure_reason().is_none());

        let email = email.mark_sent();

        assert!(email.failure_reason().is_none());
    }

    #[test]
    fn test_should_process_without_schedule() {
        assert!(email().should_process(Utc::now()));
    }

    #[test]
    fn test_should_process_respects_schedule() -> TestResult {
        let now = Utc::now();
        let mut draft = draft();
        draft.scheduled_for = Some(now + Duration::seconds(10));

        let email = EmailMessage::create(draft, now)?;

        assert!(!email.should_process(now));
        assert!(!email.should_process(now + Duration::seconds(9)));
        assert!(email.should_process(now + Duration::seconds(10)));
        assert!(email.should_process(now + Duration::seconds(11)));

        Ok(())
    }

    #[test]
    fn test_transition_maps_statuses_to_marks() {
        let email = email()
            .transition(EmailStatus::Queued, None)
            .transition(EmailStatus::Processing, None)
            .transition(EmailStatus::Failed, Some("timeout"));

        assert_eq!(email.status(), EmailStatus::Failed);
        assert_eq!(email.retry_count(), 1);

        let email = email
            .transition(EmailStatus::Queued, None)
            .transition(EmailStatus::Processing, None)
            .transition(EmailStatus::DeadLettered, None);

        assert_eq!(email.status(), EmailStatus::DeadLettered);
        assert_eq!(email.retry_count(), 1);
        assert_eq!(email.failure_reason(), Some(UNKNOWN_FAILURE_REASON));
    }

    #[test]
    fn test_transition_to_pending_is_ignored() {
        let email = email().mark_queued();

        let email = email.transition(EmailStatus::Pending, None);

        assert_eq!(email.status(), EmailStatus::Queued);
    }

    #[test]
    fn test_restore_keeps_every_field() -> TestResult {
        let original = email().mark_queued().mark_failed("timeout", true);

        let restored = EmailMessage::restore(original.to_snapshot())?;

        assert_eq!(restored, original);

        Ok(())
    }

    #[test]
    fn test_restore_requires_a_recipient() {
        let mut snapshot = email().to_snapshot();
        snapshot.recipients.clear();

        assert_eq!(
            EmailMessage::restore(snapshot),
            Err(EmailMessageError::NoRecipients)
        );
    }
}
