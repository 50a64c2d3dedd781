//! Send email command

use std::collections::{BTreeMap, HashMap};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};

use super::{
    errors::{
        AttachmentError, EmailContentError, RecipientError, ValidationError, ValidationFailure,
    },
    Attachment, EmailContent, EmailDraft, Metadata, Recipient,
};

/// Longest subject accepted, in characters
pub const MAX_SUBJECT_LENGTH: usize = 200;

/// A recipient as submitted
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecipientInput {
    /// Display name
    pub name: String,

    /// Raw email address
    pub address: String,
}

impl RecipientInput {
    /// Create a new recipient input
    pub fn new(name: &str, address: &str) -> Self {
        Self {
            name: name.to_string(),
            address: address.to_string(),
        }
    }
}

/// An attachment as submitted; exactly one of the two sources must be set
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AttachmentInput {
    /// File name
    pub file_name: String,

    /// MIME content type
    pub content_type: String,

    /// Base64-encoded file content
    pub base64_content: Option<String>,

    /// Absolute URL of the file
    pub external_url: Option<String>,
}

/// A request to send an email, not yet validated
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SendEmailCommand {
    /// Subject line
    pub subject: String,

    /// Body, replaced by the rendered template when `template_id` is set
    pub body: String,

    /// Whether `body` is HTML
    pub is_html: bool,

    /// Primary recipients
    pub to: Vec<RecipientInput>,

    /// Carbon-copy recipients
    pub cc: Vec<RecipientInput>,

    /// Blind-copy recipients
    pub bcc: Vec<RecipientInput>,

    /// Attachments
    pub attachments: Vec<AttachmentInput>,

    /// Do not deliver before this time
    pub schedule_at: Option<DateTime<Utc>>,

    /// Template to render the body from
    pub template_id: Option<String>,

    /// Variables for the template
    pub template_data: HashMap<String, String>,

    /// Caller-supplied metadata
    pub metadata: HashMap<String, String>,
}

impl SendEmailCommand {
    /// The template id, if one was given and is not blank
    pub fn template_id(&self) -> Option<&str> {
        self.template_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    /// Checks every rule, reporting all failures at once
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.build(None).map(|_| ())
    }

    /// Builds the draft of the email, using `rendered_body` as HTML body when given
    pub fn to_draft(&self, rendered_body: Option<&str>) -> Result<EmailDraft, ValidationError> {
        self.build(rendered_body)
    }

    fn build(&self, rendered_body: Option<&str>) -> Result<EmailDraft, ValidationError> {
        let mut failures = Vec::new();

        if self.subject.trim().chars().count() > MAX_SUBJECT_LENGTH {
            failures.push(ValidationFailure::new(
                "subject",
                format!("must be at most {MAX_SUBJECT_LENGTH} characters"),
            ));
        }

        let content = match rendered_body {
            Some(body) => EmailContent::new(&self.subject, body, true),
            None => EmailContent::new(&self.subject, &self.body, self.is_html),
        };

        // The submitted body is required even when a template replaces it.
        if rendered_body.is_some() && self.body.trim().is_empty() {
            failures.push(ValidationFailure::new("body", EmailContentError::EmptyBody.to_string()));
        }

        let content = content
            .map_err(|err| {
                let field = match err {
                    EmailContentError::EmptySubject => "subject",
                    EmailContentError::EmptyBody => "body",
                };
                failures.push(ValidationFailure::new(field, err.to_string()));
            })
            .ok();

        if self.to.is_empty() {
            failures.push(ValidationFailure::new("to", "at least one recipient is required"));
        }

        let recipients = parse_recipients("to", &self.to, &mut failures);
        let cc_recipients = parse_recipients("cc", &self.cc, &mut failures);
        let bcc_recipients = parse_recipients("bcc", &self.bcc, &mut failures);

        let attachments = self
            .attachments
            .iter()
            .enumerate()
            .filter_map(|(i, input)| {
                parse_attachment(input)
                    .map_err(|failure| {
                        failures.push(failure.prefixed(&format!("attachments[{i}]")))
                    })
                    .ok()
            })
            .collect::<Vec<_>>();

        let metadata = parse_metadata(&self.metadata, &mut failures);

        match (content, metadata) {
            (Some(content), Some(metadata)) if failures.is_empty() => Ok(EmailDraft {
                content,
                recipients,
                cc_recipients,
                bcc_recipients,
                attachments,
                metadata,
                scheduled_for: self.schedule_at,
            }),
            _ => Err(ValidationError(failures)),
        }
    }
}

/// Keys that differ only in case are rejected, each reported against the first in sort order
fn parse_metadata(
    input: &HashMap<String, String>,
    failures: &mut Vec<ValidationFailure>,
) -> Option<Metadata> {
    let pairs = input.iter().collect::<BTreeMap<_, _>>();

    let mut seen = HashMap::new();
    let mut duplicated = false;

    for key in pairs.keys() {
        let normalized = key.to_lowercase();

        match seen.get(&normalized) {
            Some(first) => {
                duplicated = true;
                failures.push(ValidationFailure::new(
                    format!("metadata.{key}"),
                    format!("duplicates key \"{first}\" ignoring case"),
                ));
            }
            None => {
                seen.insert(normalized, *key);
            }
        }
    }

    let metadata = Metadata::try_from_pairs(pairs.into_iter().map(|(k, v)| (k, v.clone())))
        .map_err(|err| failures.push(ValidationFailure::new("metadata", err.to_string())))
        .ok()?;

    (!duplicated).then_some(metadata)
}

fn parse_recipients(
    field: &str,
    inputs: &[RecipientInput],
    failures: &mut Vec<ValidationFailure>,
) -> Vec<Recipient> {
    inputs
        .iter()
        .enumerate()
        .filter_map(|(i, input)| {
            Recipient::new(&input.name, &input.address)
                .map_err(|err| {
                    let part = match err {
                        RecipientError::EmptyName => "name",
                        RecipientError::InvalidAddress(_) => "address",
                    };
                    failures.push(ValidationFailure::new(
                        format!("{field}[{i}].{part}"),
                        err.to_string(),
                    ));
                })
                .ok()
        })
        .collect()
}

fn parse_attachment(input: &AttachmentInput) -> Result<Attachment, ValidationFailure> {
    let content = non_blank(&input.base64_content);
    let url = non_blank(&input.external_url);

    let result = match (content, url) {
        (Some(content), None) => {
            let bytes = STANDARD.decode(content).map_err(|_| {
                ValidationFailure::new("base64_content", "is not valid base64")
            })?;

            Attachment::from_content(&input.file_name, &input.content_type, bytes)
        }
        (None, Some(url)) => Attachment::from_link(&input.file_name, &input.content_type, url),
        _ => {
            return Err(ValidationFailure::new(
                "",
                "exactly one of base64_content or external_url is required",
            ))
        }
    };

    result.map_err(|err| {
        let field = match err {
            AttachmentError::EmptyFileName => "file_name",
            AttachmentError::EmptyContentType => "content_type",
            AttachmentError::EmptyContent => "base64_content",
            AttachmentError::InvalidUrl(_) => "external_url",
        };
        ValidationFailure::new(field, err.to_string())
    })
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl ValidationFailure {
    fn prefixed(self, prefix: &str) -> Self {
        let field = if self.field.is_empty() {
            prefix.to_string()
        } else {
            format!("{prefix}.{}", self.field)
        };

        Self { field, ..self }
    }
}
