//! Notifications inbox and direct chat.

use serde::Deserialize;
use sqlx::PgPool;
use tracing::instrument;

use marketplace_core::{NotificationId, UserId};

use super::ServiceError;
use super::notifier::Notifier;
use crate::db::chat::ChatRepository;
use crate::db::notifications::NotificationRepository;
use crate::db::users::UserRepository;
use crate::models::Identity;
use crate::models::chat::ChatMessage;
use crate::models::notification::{Notification, Recipient};

/// Longest accepted chat message, in characters.
const MAX_MESSAGE_CHARS: usize = 2000;

/// Outgoing chat message.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewChatMessage {
    pub receiver_id: UserId,
    pub content: String,
}

/// Notification and chat operations.
pub struct MessagingService<'a> {
    pool: &'a PgPool,
    notifications: NotificationRepository<'a>,
}

impl<'a> MessagingService<'a> {
    /// Create a new messaging service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            pool,
            notifications: NotificationRepository::new(pool),
        }
    }

    /// Notifications addressed to the caller or the caller's role.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn list_notifications(
        &self,
        caller: &Identity,
    ) -> Result<Vec<Notification>, ServiceError> {
        Ok(self
            .notifications
            .list_for(caller.user_id, caller.role)
            .await?)
    }

    /// Mark a notification read, which deletes it.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if it does not exist.
    /// Returns `ServiceError::Forbidden` if it is addressed to someone else.
    #[instrument(skip(self, caller), fields(caller_id = %caller.user_id))]
    pub async fn mark_read(&self, caller: &Identity, id: NotificationId) -> Result<(), ServiceError> {
        let notification = self
            .notifications
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("notification"))?;
        if !notification.is_for(caller.user_id, caller.role) {
            return Err(ServiceError::forbidden("notification is addressed to someone else"));
        }
        self.notifications.delete(id).await?;
        Ok(())
    }

    /// Send a direct message and notify the receiver.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` for empty, oversized or
    /// self-addressed messages.
    /// Returns `ServiceError::NotFound` if the receiver does not exist.
    #[instrument(skip(self, caller, message), fields(caller_id = %caller.user_id))]
    pub async fn send(
        &self,
        caller: &Identity,
        message: NewChatMessage,
    ) -> Result<ChatMessage, ServiceError> {
        let content = message.content.trim();
        if content.is_empty() {
            return Err(ServiceError::validation("content is required"));
        }
        if content.chars().count() > MAX_MESSAGE_CHARS {
            return Err(ServiceError::Validation(format!(
                "content must be at most {MAX_MESSAGE_CHARS} characters"
            )));
        }
        if message.receiver_id == caller.user_id {
            return Err(ServiceError::validation("cannot message yourself"));
        }

        UserRepository::new(self.pool)
            .get_by_id(message.receiver_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("receiver"))?;

        let sent = ChatRepository::new(self.pool)
            .create(caller.user_id, message.receiver_id, content)
            .await?;

        Notifier::new(self.pool, None)
            .notify(
                Recipient::User(message.receiver_id),
                &format!("New message from {}", caller.name),
                None,
            )
            .await;

        Ok(sent)
    }

    /// Messages between the caller and another user, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn conversation(
        &self,
        caller: &Identity,
        other: UserId,
    ) -> Result<Vec<ChatMessage>, ServiceError> {
        Ok(ChatRepository::new(self.pool)
            .conversation(caller.user_id, other)
            .await?)
    }
}
