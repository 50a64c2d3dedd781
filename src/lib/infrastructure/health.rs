//! Readiness checks for the services the API depends on

use std::{collections::BTreeMap, fmt, sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::warn;
use utoipa::ToSchema;

#[cfg(test)]
use mockall::mock;

const CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// A service that has to be reachable for emails to be accepted and delivered
#[async_trait]
pub trait DependencyCheck: Send + Sync + 'static {
    /// The name the dependency is reported under
    fn name(&self) -> &'static str;

    /// Succeed when the dependency can be used
    async fn check(&self) -> anyhow::Result<()>;
}

#[cfg(test)]
mock! {
    pub DependencyCheck {}

    #[async_trait]
    impl DependencyCheck for DependencyCheck {
        fn name(&self) -> &'static str;
        async fn check(&self) -> anyhow::Result<()>;
    }
}

/// The dependencies checked by the readiness endpoint
#[derive(Clone, Default)]
pub struct Readiness {
    checks: Vec<Arc<dyn DependencyCheck>>,
}

/// Outcome of a readiness check
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ReadinessReport {
    /// Whether every dependency passed
    pub ready: bool,

    /// `ok`, or the error, per dependency
    #[schema(example = json!({"smtp": "ok", "queue": "ok"}))]
    pub checks: BTreeMap<String, String>,
}

impl Readiness {
    /// Create a readiness check with no dependencies
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a dependency
    pub fn with_check(mut self, check: impl DependencyCheck) -> Self {
        self.checks.push(Arc::new(check));
        self
    }

    /// Check every dependency, each bounded by a timeout
    pub async fn check(&self) -> ReadinessReport {
        let mut checks = BTreeMap::new();

        for dependency in &self.checks {
            let name = dependency.name();

            let outcome = match timeout(CHECK_TIMEOUT, dependency.check()).await {
                Ok(Ok(())) => "ok".to_string(),
                Ok(Err(err)) => format!("{err:#}"),
                Err(_) => format!("no answer within {}s", CHECK_TIMEOUT.as_secs()),
            };

            if outcome != "ok" {
                warn!(dependency = name, error = %outcome, "dependency not ready");
            }

            checks.insert(name.to_string(), outcome);
        }

        ReadinessReport {
            ready: checks.values().all(|outcome| outcome == "ok"),
            checks,
        }
    }
}

impl fmt::Debug for Readiness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.checks.iter().map(|check| check.name()))
            .finish()
    }
}

#[cfg(test)]
pub mod tests {
    use anyhow::anyhow;

    pub use super::MockDependencyCheck;
    use super::*;

    pub fn dependency(name: &'static str, healthy: bool) -> MockDependencyCheck {
        let mut check = MockDependencyCheck::new();

        check.expect_name().return_const(name);
        check.expect_check().returning(move || {
            if healthy {
                Ok(())
            } else {
                Err(anyhow!("connection refused"))
            }
        });

        check
    }

    #[tokio::test]
    async fn test_no_dependencies_is_ready() {
        let report = Readiness::new().check().await;

        assert!(report.ready);
        assert!(report.checks.is_empty());
    }

    #[tokio::test]
    async fn test_every_dependency_is_reported() {
        let report = Readiness::new()
            .with_check(dependency("smtp", false))
            .with_check(dependency("queue", true))
            .check()
            .await;

        assert!(!report.ready);
        assert_eq!(
            report.checks,
            BTreeMap::from([
                ("queue".to_string(), "ok".to_string()),
                ("smtp".to_string(), "connection refused".to_string()),
            ])
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_dependency_times_out() {
        struct Hanging;

        #[async_trait]
        impl DependencyCheck for Hanging {
            fn name(&self) -> &'static str {
                "smtp"
            }

            async fn check(&self) -> anyhow::Result<()> {
                std::future::pending().await
            }
        }

        let report = Readiness::new().with_check(Hanging).check().await;

        assert!(!report.ready);
        assert_eq!(report.checks["smtp"], "no answer within 5s");
    }
}
