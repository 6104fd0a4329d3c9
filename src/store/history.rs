// src/store/history.rs
// Durable mirror of the conversation, one row per turn, keyed by user
// email. Order is insertion order; the only mutation besides insert is
// the full-history delete behind reset.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::message::{ChatMessage, Role};

#[derive(Clone)]
pub struct HistoryStore {
    pool: SqlitePool,
}

impl HistoryStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Load the full conversation in creation order.
    pub async fn load(&self, user_email: &str) -> Result<Vec<ChatMessage>> {
        let rows: Vec<(String, String, String, i64)> = sqlx::query_as(
            "SELECT id, role, content, created_at FROM chat_messages \
             WHERE user_email = ?1 \
             ORDER BY created_at, rowid",
        )
        .bind(user_email)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, role, content, created_at)| ChatMessage {
                id,
                role: Role::parse(&role),
                content,
                created_at: DateTime::<Utc>::from_timestamp_millis(created_at)
                    .unwrap_or(DateTime::UNIX_EPOCH),
                recommended_content: None,
            })
            .collect())
    }

    /// Persist one turn. Recommended content is not mirrored - the text
    /// alone is durable.
    pub async fn append(&self, user_email: &str, message: &ChatMessage) -> Result<()> {
        sqlx::query(
            "INSERT INTO chat_messages (id, user_email, role, content, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&message.id)
        .bind(user_email)
        .bind(message.role.as_str())
        .bind(&message.content)
        .bind(message.created_at.timestamp_millis())
        .execute(&self.pool)
        .await?;

        debug!(user = user_email, role = message.role.as_str(), "persisted turn");
        Ok(())
    }

    /// Delete every row for this user. Idempotent.
    pub async fn reset(&self, user_email: &str) -> Result<()> {
        sqlx::query("DELETE FROM chat_messages WHERE user_email = ?1")
            .bind(user_email)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn count(&self, user_email: &str) -> Result<i64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM chat_messages WHERE user_email = ?1")
                .bind(user_email)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}
