//! Metrics handler

use axum::{extract::State, Json};

use crate::{
    domain::emails::EmailService,
    infrastructure::{http::state::AppState, metrics::EmailMetricsSnapshot},
};

/// Get the email pipeline counters
#[utoipa::path(
    get,
    operation_id = "metrics",
    tag = "System",
    path = "/api/v1/metrics",
    responses(
        (status = StatusCode::OK, description = "Current counters", body = EmailMetricsSnapshot),
    )
)]
pub async fn handler<E: EmailService>(
    State(state): State<AppState<E>>,
) -> Json<EmailMetricsSnapshot> {
    Json(state.metrics.snapshot())
}
