use axum::{
    routing::{get, post},
    Json, Router,
};
use utoipa::OpenApi;

use crate::{
    domain::emails::EmailService,
    infrastructure::http::{open_api::ApiDocs, state::AppState},
};

pub mod emails;
pub mod metrics;
pub mod ready;
pub mod stoplight;
pub mod uptime;

pub fn router<E: EmailService>() -> Router<AppState<E>> {
    Router::new()
        .route("/", get(stoplight::handler))
        .route("/openapi.json", get(Json(ApiDocs::openapi())))
        .route("/uptime", get(uptime::handler))
        .route("/metrics", get(metrics::handler))
        .route("/ready", get(ready::handler))
        .route("/emails", post(emails::send_email::handler))
        .route("/emails/:id", get(emails::get_email::handler))
}
