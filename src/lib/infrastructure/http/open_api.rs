//! OpenAPI module

use utoipa::OpenApi;

use crate::infrastructure::{
    health::ReadinessReport,
    http::{errors::ErrorResponse, handlers::v1::*},
    metrics::EmailMetricsSnapshot,
};

#[derive(Debug, OpenApi)]
#[openapi(
    info(title = "Email Dispatch API"),
    paths(
        emails::send_email::handler,
        emails::get_email::handler,
        metrics::handler,
        ready::handler,
        uptime::handler
    ),
    components(schemas(
        emails::send_email::SendEmailBody,
        emails::send_email::RecipientBody,
        emails::send_email::AttachmentBody,
        emails::send_email::SendEmailResponse,
        emails::get_email::GetEmailResponse,
        uptime::UptimeResponse,
        EmailMetricsSnapshot,
        ReadinessReport,
        ErrorResponse,
    ))
)]
pub struct ApiDocs;
