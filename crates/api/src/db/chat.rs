//! Chat message repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use marketplace_core::{ChatMessageId, UserId};

use super::RepositoryError;
use crate::models::chat::ChatMessage;

#[derive(sqlx::FromRow)]
struct ChatMessageRow {
    id: i32,
    sender_id: i32,
    receiver_id: i32,
    content: String,
    created_at: DateTime<Utc>,
}

impl From<ChatMessageRow> for ChatMessage {
    fn from(r: ChatMessageRow) -> Self {
        Self {
            id: ChatMessageId::new(r.id),
            sender_id: UserId::new(r.sender_id),
            receiver_id: UserId::new(r.receiver_id),
            content: r.content,
            created_at: r.created_at,
        }
    }
}

/// Repository for direct messages.
pub struct ChatRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ChatRepository<'a> {
    /// Create a new chat repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a message.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        sender: UserId,
        receiver: UserId,
        content: &str,
    ) -> Result<ChatMessage, RepositoryError> {
        let row = sqlx::query_as::<_, ChatMessageRow>(
            r"
            INSERT INTO marketplace.chat_message (sender_id, receiver_id, content)
            VALUES ($1, $2, $3)
            RETURNING id, sender_id, receiver_id, content, created_at
            ",
        )
        .bind(sender)
        .bind(receiver)
        .bind(content)
        .fetch_one(self.pool)
        .await?;

        Ok(ChatMessage::from(row))
    }

    /// Messages exchanged between two users, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn conversation(
        &self,
        a: UserId,
        b: UserId,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        let rows = sqlx::query_as::<_, ChatMessageRow>(
            r"
            SELECT id, sender_id, receiver_id, content, created_at
            FROM marketplace.chat_message
            WHERE (sender_id = $1 AND receiver_id = $2)
               OR (sender_id = $2 AND receiver_id = $1)
            ORDER BY created_at, id
            ",
        )
        .bind(a)
        .bind(b)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(ChatMessage::from).collect())
    }
}
