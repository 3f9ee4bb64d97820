//! Stored contact messages.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::form::{MessageStore, SubmissionResults};

/// One stored contact message.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
    /// Unique identifier (UUIDv7).
    pub id: Uuid,

    /// Submitted field values, keyed by field name. Values are stored
    /// HTML-escaped, exactly as they re-render.
    pub fields: Value,

    /// Unix timestamp when received.
    pub created: i64,
}

impl Message {
    /// Store a new message.
    pub async fn create(pool: &PgPool, fields: Value) -> Result<Self> {
        let id = Uuid::now_v7();
        let now = chrono::Utc::now().timestamp();

        let message = sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO message (id, fields, created)
            VALUES ($1, $2, $3)
            RETURNING id, fields, created
            "#,
        )
        .bind(id)
        .bind(&fields)
        .bind(now)
        .fetch_one(pool)
        .await
        .context("failed to store message")?;

        Ok(message)
    }

    /// List recent messages, newest first.
    pub async fn list_recent(pool: &PgPool, limit: i64) -> Result<Vec<Self>> {
        let messages = sqlx::query_as::<_, Message>(
            r#"
            SELECT id, fields, created
            FROM message
            ORDER BY created DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("failed to list messages")?;

        Ok(messages)
    }

    /// Count all stored messages.
    pub async fn count_all(pool: &PgPool) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM message")
            .fetch_one(pool)
            .await
            .context("failed to count messages")?;

        Ok(count)
    }
}

/// [`MessageStore`] backed by the message table.
#[derive(Debug, Clone)]
pub struct SqlMessageStore {
    pool: PgPool,
}

impl SqlMessageStore {
    /// Create a store over the given pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageStore for SqlMessageStore {
    async fn store(&self, data: &SubmissionResults) -> Result<()> {
        let fields: serde_json::Map<String, Value> = data
            .iter()
            .map(|(name, field)| (name.clone(), Value::String(field.value.clone())))
            .collect();

        Message::create(&self.pool, Value::Object(fields)).await?;

        Ok(())
    }
}
