//! JSON wire format of queued emails

use std::collections::BTreeMap;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::emails::{
    errors::QueueError, Attachment, AttachmentSource, EmailContent, EmailMessage, EmailSnapshot,
    EmailStatus, Metadata, Recipient,
};

#[derive(Debug, Serialize, Deserialize)]
struct EmailPayload {
    id: Uuid,
    subject: String,
    body: String,
    is_html: bool,
    recipients: Vec<RecipientPayload>,
    #[serde(default)]
    cc_recipients: Vec<RecipientPayload>,
    #[serde(default)]
    bcc_recipients: Vec<RecipientPayload>,
    #[serde(default)]
    attachments: Vec<AttachmentPayload>,
    #[serde(default)]
    metadata: BTreeMap<String, String>,
    status: EmailStatus,
    retry_count: u32,
    created_at: DateTime<Utc>,
    scheduled_for: Option<DateTime<Utc>>,
    failure_reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RecipientPayload {
    name: String,
    address: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct AttachmentPayload {
    file_name: String,
    content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    base64_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    external_url: Option<String>,
}

/// Serializes an email, every field included
pub fn encode(email: &EmailMessage) -> Result<String, QueueError> {
    let snapshot = email.to_snapshot();

    let payload = EmailPayload {
        id: snapshot.id,
        subject: snapshot.content.subject().to_string(),
        body: snapshot.content.body().to_string(),
        is_html: snapshot.content.is_html(),
        recipients: snapshot.recipients.iter().map(RecipientPayload::from).collect(),
        cc_recipients: snapshot.cc_recipients.iter().map(RecipientPayload::from).collect(),
        bcc_recipients: snapshot.bcc_recipients.iter().map(RecipientPayload::from).collect(),
        attachments: snapshot.attachments.iter().map(AttachmentPayload::from).collect(),
        metadata: snapshot
            .metadata
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect(),
        status: snapshot.status,
        retry_count: snapshot.retry_count,
        created_at: snapshot.created_at,
        scheduled_for: snapshot.scheduled_for,
        failure_reason: snapshot.failure_reason,
    };

    serde_json::to_string(&payload).map_err(|err| QueueError::InvalidPayload(err.to_string()))
}

/// Deserializes an email, validating every value again
pub fn decode(payload: &str) -> Result<EmailMessage, QueueError> {
    let payload: EmailPayload =
        serde_json::from_str(payload).map_err(|err| QueueError::InvalidPayload(err.to_string()))?;

    let snapshot = EmailSnapshot {
        id: payload.id,
        content: EmailContent::new(&payload.subject, &payload.body, payload.is_html)
            .map_err(invalid)?,
        recipients: recipients(payload.recipients)?,
        cc_recipients: recipients(payload.cc_recipients)?,
        bcc_recipients: recipients(payload.bcc_recipients)?,
        attachments: payload
            .attachments
            .into_iter()
            .map(Attachment::try_from)
            .collect::<Result<Vec<_>, _>>()?,
        metadata: Metadata::try_from_pairs(payload.metadata).map_err(invalid)?,
        status: payload.status,
        retry_count: payload.retry_count,
        created_at: payload.created_at,
        scheduled_for: payload.scheduled_for,
        failure_reason: payload.failure_reason,
    };

    EmailMessage::restore(snapshot).map_err(invalid)
}

fn invalid(err: impl ToString) -> QueueError {
    QueueError::InvalidPayload(err.to_string())
}

fn recipients(payloads: Vec<RecipientPayload>) -> Result<Vec<Recipient>, QueueError> {
    payloads
        .into_iter()
        .map(|recipient| Recipient::new(&recipient.name, &recipient.address).map_err(invalid))
        .collect()
}

impl From<&Recipient> for RecipientPayload {
    fn from(recipient: &Recipient) -> Self {
        Self {
            name: recipient.name().to_string(),
            address: recipient.address().to_string(),
        }
    }
}

impl From<&Attachment> for AttachmentPayload {
    fn from(attachment: &Attachment) -> Self {
        let (base64_content, external_url) = match attachment.source() {
            AttachmentSource::Content(content) => (Some(STANDARD.encode(content)), None),
            AttachmentSource::Link(url) => (None, Some(url.to_string())),
        };

        Self {
            file_name: attachment.file_name().to_string(),
            content_type: attachment.content_type().to_string(),
            base64_content,
            external_url,
        }
    }
}

impl TryFrom<AttachmentPayload> for Attachment {
    type Error = QueueError;

    fn try_from(payload: AttachmentPayload) -> Result<Self, Self::Error> {
        match (payload.base64_content, payload.external_url) {
            (Some(content), None) => {
                let content = STANDARD.decode(content).map_err(invalid)?;

                Attachment::from_content(&payload.file_name, &payload.content_type, content)
                    .map_err(invalid)
            }
            (None, Some(url)) => {
                Attachment::from_link(&payload.file_name, &payload.content_type, &url)
                    .map_err(invalid)
            }
            _ => Err(QueueError::InvalidPayload(format!(
                "attachment \"{}\" must have exactly one source",
                payload.file_name
            ))),
        }
    }
}
