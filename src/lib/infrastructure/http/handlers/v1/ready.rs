//! Readiness handler

use axum::{extract::State, http::StatusCode, Json};

use crate::{
    domain::emails::EmailService,
    infrastructure::{health::ReadinessReport, http::state::AppState},
};

/// Check that the services the API depends on are reachable
#[utoipa::path(
    get,
    operation_id = "ready",
    tag = "System",
    path = "/api/v1/ready",
    responses(
        (status = StatusCode::OK, description = "Every dependency is reachable", body = ReadinessReport),
        (status = StatusCode::SERVICE_UNAVAILABLE, description = "A dependency is unreachable", body = ReadinessReport),
    )
)]
pub async fn handler<E: EmailService>(
    State(state): State<AppState<E>>,
) -> (StatusCode, Json<ReadinessReport>) {
    let report = state.readiness.check().await;

    let status = if report.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(report))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use testresult::TestResult;

    use crate::infrastructure::{
        health::{tests::dependency, Readiness, ReadinessReport},
        http::{router, state::tests::test_state},
    };

    #[tokio::test]
    async fn test_ready_when_dependencies_answer() -> TestResult {
        let mut state = test_state(None);
        state.readiness = Readiness::new()
            .with_check(dependency("smtp", true))
            .with_check(dependency("queue", true));

        let response = TestServer::new(router(state))?.get("/api/v1/ready").await;

        response.assert_status_ok();

        let json = response.json::<ReadinessReport>();

        assert!(json.ready);
        assert_eq!(json.checks["smtp"], "ok");
        assert_eq!(json.checks["queue"], "ok");

        Ok(())
    }

    #[tokio::test]
    async fn test_unavailable_when_smtp_is_down() -> TestResult {
        let mut state = test_state(None);
        state.readiness = Readiness::new()
            .with_check(dependency("smtp", false))
            .with_check(dependency("queue", true));

        let response = TestServer::new(router(state))?.get("/api/v1/ready").await;

        response.assert_status(StatusCode::SERVICE_UNAVAILABLE);

        let json = response.json::<ReadinessReport>();

        assert!(!json.ready);
        assert_eq!(json.checks["smtp"], "connection refused");
        assert_eq!(json.checks["queue"], "ok");

        Ok(())
    }
}
