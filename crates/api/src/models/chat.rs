//! Direct messages between users.

use chrono::{DateTime, Utc};
use serde::Serialize;

use marketplace_core::{ChatMessageId, UserId};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: ChatMessageId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub content: String,
    pub created_at: DateTime<Utc>,
}
