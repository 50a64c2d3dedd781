//! Delivery queue adapters

mod memory;
mod postgres;

pub mod payload;

use anyhow::Context;
use async_trait::async_trait;
use clap::{Parser, ValueEnum};
use tracing::info;

use crate::{
    domain::emails::{errors::QueueError, EmailMessage, EmailQueueConsumer, EmailQueueProducer},
    infrastructure::{
        database::postgres::{DatabaseConnectionDetails, PostgresDatabase},
        health::DependencyCheck,
    },
};

pub use memory::InMemoryEmailQueue;
pub use postgres::PostgresEmailQueue;

/// Which queue implementation to run with
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum QueueKind {
    /// In-process queue, lost on restart and invisible to other processes
    Memory,

    /// The `email_queue` table
    Postgres,
}

/// Queue configuration
#[derive(Debug, Clone, Parser)]
pub struct QueueConfig {
    /// The queue backend
    #[arg(
        long = "queue-backend",
        env = "EMAIL_QUEUE_BACKEND",
        value_enum,
        default_value_t = QueueKind::Memory
    )]
    pub kind: QueueKind,

    /// The database connection details, required by the postgres backend
    #[clap(flatten)]
    pub db: DatabaseConnectionDetails,
}

impl QueueConfig {
    /// Fail when emails published to the queue could never be pulled
    ///
    /// The memory queue is only visible inside one process, so it needs the producer and the
    /// consumer to run together.
    ///
    /// # Arguments
    /// * `shares_process` - Whether this process both publishes and pulls.
    pub fn ensure_consumable(&self, shares_process: bool) -> anyhow::Result<()> {
        if self.kind == QueueKind::Memory && !shares_process {
            anyhow::bail!(
                "the memory queue is not shared between processes; \
                 run the embedded worker or use --queue-backend postgres"
            );
        }

        Ok(())
    }
}

/// A queue chosen at runtime
#[derive(Debug, Clone)]
pub enum EmailQueueBackend {
    /// See [`InMemoryEmailQueue`]
    Memory(InMemoryEmailQueue),

    /// See [`PostgresEmailQueue`]
    Postgres(PostgresEmailQueue),
}

impl EmailQueueBackend {
    /// Build the configured queue, connecting and migrating the database when needed
    #[mutants::skip]
    pub async fn connect(config: &QueueConfig) -> anyhow::Result<Self> {
        match config.kind {
            QueueKind::Memory => {
                info!("using in-memory email queue");

                Ok(Self::Memory(InMemoryEmailQueue::new()))
            }
            QueueKind::Postgres => {
                let connection_string = config
                    .db
                    .connection_string
                    .as_deref()
                    .context("DATABASE_URL is required by the postgres queue backend")?;

                let db = PostgresDatabase::new(connection_string).await?;
                db.migrate().await?;

                info!("using postgres email queue");

                Ok(Self::Postgres(PostgresEmailQueue::new(db)))
            }
        }
    }
}

#[async_trait]
impl EmailQueueProducer for EmailQueueBackend {
    async fn publish(&self, email: &EmailMessage) -> Result<(), QueueError> {
        match self {
            Self::Memory(queue) => queue.publish(email).await,
            Self::Postgres(queue) => queue.publish(email).await,
        }
    }
}

#[async_trait]
impl EmailQueueConsumer for EmailQueueBackend {
    async fn pull(&self) -> Result<Option<EmailMessage>, QueueError> {
        match self {
            Self::Memory(queue) => queue.pull().await,
            Self::Postgres(queue) => queue.pull().await,
        }
    }
}

#[async_trait]
impl DependencyCheck for EmailQueueBackend {
    fn name(&self) -> &'static str {
        "queue"
    }

    async fn check(&self) -> anyhow::Result<()> {
        match self {
            Self::Memory(_) => Ok(()),
            Self::Postgres(queue) => queue.database().ping().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::domain::emails::tests::email;

    use super::*;

    #[test]
    fn test_config_defaults_to_memory() -> TestResult {
        let config = QueueConfig::try_parse_from(["worker"])?;

        assert_eq!(config.kind, QueueKind::Memory);

        Ok(())
    }

    #[test]
    fn test_config_parses_postgres() -> TestResult {
        let config = QueueConfig::try_parse_from([
            "worker",
            "--queue-backend",
            "postgres",
            "--database-url",
            "postgres://localhost/emails",
        ])?;

        assert_eq!(config.kind, QueueKind::Postgres);
        assert_eq!(
            config.db.connection_string.as_deref(),
            Some("postgres://localhost/emails")
        );

        Ok(())
    }

    fn memory_config() -> QueueConfig {
        QueueConfig {
            kind: QueueKind::Memory,
            db: DatabaseConnectionDetails {
                connection_string: None,
            },
        }
    }

    #[test]
    fn test_memory_queue_needs_a_consumer_in_process() {
        let config = memory_config();

        assert!(config.ensure_consumable(true).is_ok());

        let err = config
            .ensure_consumable(false)
            .expect_err("memory queue without an in-process consumer");

        assert!(err.to_string().contains("--queue-backend postgres"));
    }

    #[test]
    fn test_postgres_queue_is_consumable_from_anywhere() {
        let config = QueueConfig {
            kind: QueueKind::Postgres,
            ..memory_config()
        };

        assert!(config.ensure_consumable(false).is_ok());
        assert!(config.ensure_consumable(true).is_ok());
    }

    #[tokio::test]
    async fn test_memory_backend_is_always_ready() -> TestResult {
        let queue = EmailQueueBackend::connect(&memory_config()).await?;

        assert_eq!(queue.name(), "queue");
        queue.check().await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_memory_backend_round_trips() -> TestResult {
        let queue = EmailQueueBackend::connect(&memory_config()).await?;
        let email = email().mark_queued();

        queue.publish(&email).await?;

        assert_eq!(queue.pull().await?, Some(email));
        assert_eq!(queue.pull().await?, None);

        Ok(())
    }
}
