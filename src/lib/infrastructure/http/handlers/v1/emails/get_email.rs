//! Get email handler

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    domain::emails::{EmailMessage, EmailService},
    infrastructure::http::{errors::ApiError, state::AppState},
};

/// Get email response body
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GetEmailResponse {
    id: Uuid,

    #[schema(example = "Sent")]
    status: String,

    /// Why the last attempt failed, if it did
    failure_reason: Option<String>,

    retry_count: u32,

    scheduled_for: Option<DateTime<Utc>>,

    created_at: DateTime<Utc>,
}

impl From<EmailMessage> for GetEmailResponse {
    fn from(email: EmailMessage) -> Self {
        Self {
            id: email.id(),
            status: email.status().to_string(),
            failure_reason: email.failure_reason().map(str::to_string),
            retry_count: email.retry_count(),
            scheduled_for: email.scheduled_for(),
            created_at: email.created_at(),
        }
    }
}

/// Get the delivery status of an email
#[utoipa::path(
    get,
    operation_id = "get_email",
    tag = "Emails",
    path = "/api/v1/emails/{id}",
    params(
        ("id" = Uuid, Path, description = "Email ID")
    ),
    responses(
        (status = StatusCode::OK, description = "Email found", body = GetEmailResponse),
        (status = StatusCode::NOT_FOUND, description = "Email not found", body = ErrorResponse),
    )
)]
pub async fn handler<E: EmailService>(
    State(state): State<AppState<E>>,
    Path(id): Path<Uuid>,
) -> Result<Json<GetEmailResponse>, ApiError> {
    let email = state.emails.get_email(&id).await?;

    Ok(Json(email.into()))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use testresult::TestResult;
    use uuid::Uuid;

    use crate::{
        domain::emails::{
            errors::GetEmailError,
            tests::{email, MockEmailService},
        },
        infrastructure::http::{
            errors::ErrorResponse, handlers::v1::emails::get_email::GetEmailResponse, router,
            state::tests::test_state,
        },
    };

    #[tokio::test]
    async fn test_get_email_success() -> TestResult {
        let mut emails = MockEmailService::new();
        let email = email()
            .mark_queued()
            .mark_processing()
            .mark_failed("timeout", true);
        let id = email.id();

        emails
            .expect_get_email()
            .withf(move |requested| requested == &id)
            .times(1)
            .returning(move |_| Ok(email.clone()));

        let response = TestServer::new(router(test_state(Some(emails))))?
            .get(&format!("/api/v1/emails/{id}"))
            .await;

        response.assert_status_ok();

        let json = response.json::<GetEmailResponse>();

        assert_eq!(json.id, id);
        assert_eq!(json.status, "Failed");
        assert_eq!(json.failure_reason.as_deref(), Some("timeout"));
        assert_eq!(json.retry_count, 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_get_email_not_found() -> TestResult {
        let mut emails = MockEmailService::new();
        let id = Uuid::now_v7();

        emails
            .expect_get_email()
            .times(1)
            .returning(move |id| Err(GetEmailError::NotFound(*id)));

        let response = TestServer::new(router(test_state(Some(emails))))?
            .get(&format!("/api/v1/emails/{id}"))
            .await;

        response.assert_status(StatusCode::NOT_FOUND);

        let json = response.json::<ErrorResponse>();

        assert_eq!(json.error, format!("Email with id \"{id}\" not found"));

        Ok(())
    }

    #[tokio::test]
    async fn test_get_email_invalid_id() -> TestResult {
        let response = TestServer::new(router(test_state(None)))?
            .get("/api/v1/emails/not-a-uuid")
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);

        Ok(())
    }
}
