//! Postgres-backed queue shared by several processes

use anyhow::anyhow;
use async_trait::async_trait;
use sqlx::{query, query_as, FromRow};
use tracing::trace;

use crate::{
    domain::emails::{errors::QueueError, EmailMessage, EmailQueueConsumer, EmailQueueProducer},
    infrastructure::database::postgres::PostgresDatabase,
};

use super::payload::{decode, encode};

#[derive(FromRow)]
struct QueueRecord {
    id: i64,
    payload: String,
}

/// Queue stored in the `email_queue` table
///
/// Pulling deletes the oldest row under `FOR UPDATE SKIP LOCKED`, so concurrent workers never
/// receive the same entry.
#[derive(Debug, Clone)]
pub struct PostgresEmailQueue {
    db: PostgresDatabase,
}

impl PostgresEmailQueue {
    /// Create a new queue on an already migrated database
    pub fn new(db: PostgresDatabase) -> Self {
        Self { db }
    }

    /// The database the queue lives in
    pub fn database(&self) -> &PostgresDatabase {
        &self.db
    }
}

#[async_trait]
impl EmailQueueProducer for PostgresEmailQueue {
    #[mutants::skip]
    async fn publish(&self, email: &EmailMessage) -> Result<(), QueueError> {
        let payload = encode(email)?;

        query(
            r#"
            INSERT INTO email_queue (payload)
            VALUES ($1)
            "#,
        )
        .bind(payload)
        .execute(self.db.connection())
        .await
        .map_err(|err| anyhow!("Unknown database error: {:?}", err))?;

        trace!(email_id = %email.id(), "published email");

        Ok(())
    }
}

#[async_trait]
impl EmailQueueConsumer for PostgresEmailQueue {
    #[mutants::skip]
    async fn pull(&self) -> Result<Option<EmailMessage>, QueueError> {
        let record = query_as::<_, QueueRecord>(
            r#"
            DELETE FROM email_queue
            WHERE id = (
                SELECT id
                FROM email_queue
                ORDER BY id
                FOR UPDATE SKIP LOCKED
                LIMIT 1
            )
            RETURNING id, payload
            "#,
        )
        .fetch_optional(self.db.connection())
        .await
        .map_err(|err| anyhow!("Unknown database error: {:?}", err))?;

        let Some(record) = record else {
            return Ok(None);
        };

        trace!(entry_id = record.id, "pulled queue entry");

        decode(&record.payload).map(Some)
    }
}
