//! Send email handler

use std::collections::HashMap;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    domain::emails::{AttachmentInput, EmailService, RecipientInput, SendEmailCommand},
    infrastructure::http::{errors::ApiError, state::AppState},
};

/// A recipient of the email
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct RecipientBody {
    /// Display name
    #[schema(example = "Ada Lovelace")]
    name: String,

    /// Email address
    #[schema(example = "ada@example.com")]
    email: String,
}

/// An attachment, given either inline or as a link
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct AttachmentBody {
    /// File name
    #[schema(example = "invoice.pdf")]
    file_name: String,

    /// MIME content type
    #[schema(example = "application/pdf")]
    content_type: String,

    /// Base64-encoded file content
    #[serde(default)]
    base64_content: Option<String>,

    /// Absolute URL of the file
    #[serde(default)]
    #[schema(example = "https://example.com/invoice.pdf")]
    external_url: Option<String>,
}

/// Send email request body
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct SendEmailBody {
    /// Subject line
    #[schema(example = "Your invoice")]
    subject: String,

    /// Body, ignored in favour of the rendered template when `template_id` is set
    #[schema(example = "<p>Your invoice is attached.</p>")]
    body: String,

    /// Whether the body is HTML
    #[serde(default)]
    is_html: bool,

    /// Primary recipients
    #[serde(default)]
    to: Vec<RecipientBody>,

    /// Carbon-copy recipients
    #[serde(default)]
    cc: Vec<RecipientBody>,

    /// Blind-copy recipients
    #[serde(default)]
    bcc: Vec<RecipientBody>,

    /// Attachments
    #[serde(default)]
    attachments: Vec<AttachmentBody>,

    /// Do not deliver before this time
    #[serde(default)]
    schedule_at: Option<DateTime<Utc>>,

    /// Template to render the body from
    #[serde(default)]
    #[schema(example = "welcome")]
    template_id: Option<String>,

    /// Values for the template's placeholders
    #[serde(default)]
    template_data: HashMap<String, String>,

    /// Free-form metadata, keys compared without case
    #[serde(default)]
    metadata: HashMap<String, String>,
}

impl From<RecipientBody> for RecipientInput {
    fn from(body: RecipientBody) -> Self {
        Self {
            name: body.name,
            address: body.email,
        }
    }
}

impl From<AttachmentBody> for AttachmentInput {
    fn from(body: AttachmentBody) -> Self {
        Self {
            file_name: body.file_name,
            content_type: body.content_type,
            base64_content: body.base64_content,
            external_url: body.external_url,
        }
    }
}

impl From<SendEmailBody> for SendEmailCommand {
    fn from(body: SendEmailBody) -> Self {
        Self {
            subject: body.subject,
            body: body.body,
            is_html: body.is_html,
            to: body.to.into_iter().map(Into::into).collect(),
            cc: body.cc.into_iter().map(Into::into).collect(),
            bcc: body.bcc.into_iter().map(Into::into).collect(),
            attachments: body.attachments.into_iter().map(Into::into).collect(),
            schedule_at: body.schedule_at,
            template_id: body.template_id,
            template_data: body.template_data,
            metadata: body.metadata,
        }
    }
}

/// Send email response body
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SendEmailResponse {
    /// The id assigned to the email
    id: Uuid,

    /// The status of the email when it was accepted
    #[schema(example = "Queued")]
    status: String,
}

/// Queue an email for delivery
#[utoipa::path(
    post,
    operation_id = "send_email",
    tag = "Emails",
    path = "/api/v1/emails",
    request_body = SendEmailBody,
    responses(
        (status = StatusCode::ACCEPTED, description = "Email queued", body = SendEmailResponse),
        (status = StatusCode::BAD_REQUEST, description = "Malformed request body", body = ErrorResponse),
        (status = StatusCode::UNPROCESSABLE_ENTITY, description = "Invalid email", body = ErrorResponse, example = json!({"error": "to: at least one recipient is required"})),
    )
)]
pub async fn handler<E: EmailService>(
    State(state): State<AppState<E>>,
    request: Result<Json<SendEmailBody>, JsonRejection>,
) -> Result<(StatusCode, Json<SendEmailResponse>), ApiError> {
    let Json(request) = request?;
    let command: SendEmailCommand = request.into();

    let receipt = state.emails.send_email(&command).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(SendEmailResponse {
            id: receipt.id,
            status: receipt.status.to_string(),
        }),
    ))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::json;
    use testresult::TestResult;
    use uuid::Uuid;

    use crate::{
        domain::{
            communication::templates::TemplateError,
            emails::{
                errors::{SendEmailError, ValidationError, ValidationFailure},
                tests::MockEmailService,
                EmailReceipt, EmailStatus,
            },
        },
        infrastructure::http::{
            errors::ErrorResponse, handlers::v1::emails::send_email::SendEmailResponse, router,
            state::tests::test_state,
        },
    };

    fn body() -> serde_json::Value {
        json!({
            "subject": "Your invoice",
            "body": "<p>Attached.</p>",
            "is_html": true,
            "to": [{ "name": "Ada", "email": "ada@example.com" }],
            "attachments": [{
                "file_name": "invoice.pdf",
                "content_type": "application/pdf",
                "external_url": "https://example.com/invoice.pdf"
            }],
            "metadata": { "Tenant": "acme" }
        })
    }

    #[tokio::test]
    async fn test_send_email_success() -> TestResult {
        let mut emails = MockEmailService::new();
        let id = Uuid::now_v7();

        emails
            .expect_send_email()
            .withf(|command| {
                command.subject == "Your invoice"
                    && command.to[0].address == "ada@example.com"
                    && command.attachments[0].external_url.as_deref()
                        == Some("https://example.com/invoice.pdf")
                    && command.metadata.get("Tenant").map(String::as_str) == Some("acme")
            })
            .times(1)
            .returning(move |_| {
                Ok(EmailReceipt {
                    id,
                    status: EmailStatus::Queued,
                })
            });

        let response = TestServer::new(router(test_state(Some(emails))))?
            .post("/api/v1/emails")
            .json(&body())
            .await;

        response.assert_status(StatusCode::ACCEPTED);

        let json = response.json::<SendEmailResponse>();

        assert_eq!(json.id, id);
        assert_eq!(json.status, "Queued");

        Ok(())
    }

    #[tokio::test]
    async fn test_send_email_validation_error() -> TestResult {
        let mut emails = MockEmailService::new();

        emails.expect_send_email().times(1).returning(|_| {
            Err(SendEmailError::Validation(ValidationError(vec![
                ValidationFailure::new("to", "at least one recipient is required"),
            ])))
        });

        let response = TestServer::new(router(test_state(Some(emails))))?
            .post("/api/v1/emails")
            .json(&json!({ "subject": "Hello", "body": "Hi" }))
            .await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);

        let json = response.json::<ErrorResponse>();

        assert_eq!(json.error, "to: at least one recipient is required");

        Ok(())
    }

    #[tokio::test]
    async fn test_send_email_unknown_template() -> TestResult {
        let mut emails = MockEmailService::new();

        emails.expect_send_email().times(1).returning(|_| {
            Err(SendEmailError::Template(TemplateError::TemplateNotFound(
                "welcome".to_string(),
            )))
        });

        let mut body = body();
        body["template_id"] = json!("welcome");

        let response = TestServer::new(router(test_state(Some(emails))))?
            .post("/api/v1/emails")
            .json(&body)
            .await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);

        Ok(())
    }

    #[tokio::test]
    async fn test_send_email_malformed_json() -> TestResult {
        let mut emails = MockEmailService::new();
        emails.expect_send_email().never();

        let response = TestServer::new(router(test_state(Some(emails))))?
            .post("/api/v1/emails")
            .text("{\"subject\": ")
            .content_type("application/json")
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);

        Ok(())
    }
}
