//! API error-handling module

use std::fmt;

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::ToSchema;

use crate::domain::{
    communication::templates::TemplateError,
    emails::errors::{GetEmailError, SendEmailError},
};

/// An error response
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// The error message
    #[schema(example = "Internal server error")]
    pub error: String,
}

/// An error raised in the API
#[derive(Debug, Deserialize, ToSchema)]
pub struct ApiError {
    /// The status code
    #[schema(example = 500, value_type = u16)]
    #[serde(with = "http_serde::status_code")]
    pub status: StatusCode,

    /// The error message
    #[schema(example = "Internal server error")]
    pub message: String,
}

impl ApiError {
    /// Create a new API error
    pub fn new(status: StatusCode, message: &str) -> Self {
        Self {
            status,
            message: message.to_string(),
        }
    }

    /// Create a new not found error
    pub fn new_404(message: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// Create a new unprocessable entity error
    pub fn new_422(message: &str) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, message)
    }

    /// Create new internal server error
    pub fn new_500(message: &str) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        unknown_error(&err)
    }
}

impl From<SendEmailError> for ApiError {
    fn from(err: SendEmailError) -> Self {
        match err {
            SendEmailError::Validation(err) => ApiError::new_422(&err.to_string()),
            SendEmailError::Template(err) => err.into(),
            SendEmailError::UnknownError(err) => unknown_error(&err),
        }
    }
}

impl From<TemplateError> for ApiError {
    fn from(err: TemplateError) -> Self {
        match err {
            TemplateError::TemplateNotFound(id) => {
                ApiError::new_422(&format!("Template \"{id}\" not found"))
            }
            TemplateError::EmptyTemplateId => ApiError::new_422("Please provide a template id"),
            TemplateError::RenderFailed {
                template_id,
                reason,
            } => ApiError::new_422(&format!(
                "Template \"{template_id}\" could not be rendered: {reason}"
            )),
            err @ TemplateError::InvalidTemplate { .. } => {
                unknown_error(&anyhow::Error::from(err))
            }
            TemplateError::UnknownError(err) => unknown_error(&err),
        }
    }
}

impl From<GetEmailError> for ApiError {
    fn from(err: GetEmailError) -> Self {
        match err {
            GetEmailError::NotFound(id) => {
                ApiError::new_404(&format!("Email with id \"{id}\" not found"))
            }
            GetEmailError::UnknownError(err) => unknown_error(&err),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::new(rejection.status(), &rejection.body_text())
    }
}

fn unknown_error(err: &anyhow::Error) -> ApiError {
    error!(error = ?err, "unhandled API error");

    ApiError::new_500("An unknown error occurred, please try again")
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;
    use axum::{body::to_bytes, http::StatusCode, response::IntoResponse};
    use testresult::TestResult;
    use uuid::Uuid;

    use crate::domain::emails::errors::{ValidationError, ValidationFailure};

    use super::*;

    #[tokio::test]
    async fn test_error_response() -> TestResult {
        let error = ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "Internal server error".to_string(),
        };

        let response = error.into_response();
        let body = to_bytes(response.into_body(), usize::MAX).await?;

        assert_eq!(body, r#"{"error":"Internal server error"}"#);

        Ok(())
    }

    #[test]
    fn test_api_error_from_error_hides_details() {
        let api_error = ApiError::from(anyhow!("connection refused"));

        assert_eq!(api_error.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            api_error.message,
            "An unknown error occurred, please try again"
        );
    }

    #[test]
    fn test_validation_error_is_unprocessable() {
        let api_error = ApiError::from(SendEmailError::Validation(ValidationError(vec![
            ValidationFailure::new("to", "at least one recipient is required"),
        ])));

        assert_eq!(api_error.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(api_error.message, "to: at least one recipient is required");
    }

    #[test]
    fn test_unknown_template_is_unprocessable() {
        let api_error = ApiError::from(SendEmailError::Template(
            TemplateError::TemplateNotFound("welcome".to_string()),
        ));

        assert_eq!(api_error.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(api_error.message, "Template \"welcome\" not found");
    }

    #[test]
    fn test_template_render_failure_is_unprocessable() {
        let api_error = ApiError::from(TemplateError::RenderFailed {
            template_id: "welcome".to_string(),
            reason: "Helper not defined: shout".to_string(),
        });

        assert_eq!(api_error.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            api_error.message,
            "Template \"welcome\" could not be rendered: Helper not defined: shout"
        );
    }

    #[test]
    fn test_missing_email_is_not_found() {
        let id = Uuid::now_v7();

        let api_error = ApiError::from(GetEmailError::NotFound(id));

        assert_eq!(api_error.status, StatusCode::NOT_FOUND);
        assert_eq!(api_error.message, format!("Email with id \"{id}\" not found"));
    }
}
