//! Notification repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use marketplace_core::{NotificationId, OrderId, Role, UserId};

use super::RepositoryError;
use crate::models::notification::{Notification, Recipient};

#[derive(sqlx::FromRow)]
struct NotificationRow {
    id: i32,
    message: String,
    user_id: Option<i32>,
    role: Option<Role>,
    order_id: Option<i32>,
    is_read: bool,
    read_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<NotificationRow> for Notification {
    fn from(r: NotificationRow) -> Self {
        Self {
            id: NotificationId::new(r.id),
            message: r.message,
            user_id: r.user_id.map(UserId::new),
            role: r.role,
            order_id: r.order_id.map(OrderId::new),
            is_read: r.is_read,
            read_at: r.read_at,
            created_at: r.created_at,
        }
    }
}

/// Repository for notifications.
pub struct NotificationRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> NotificationRepository<'a> {
    /// Create a new notification repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a notification for a user or a role.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        recipient: Recipient,
        message: &str,
        order_id: Option<OrderId>,
    ) -> Result<NotificationId, RepositoryError> {
        let (user_id, role) = match recipient {
            Recipient::User(id) => (Some(id), None),
            Recipient::Role(role) => (None, Some(role)),
        };

        let id = sqlx::query_scalar::<_, i32>(
            r"
            INSERT INTO marketplace.notification (message, user_id, role, order_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            ",
        )
        .bind(message)
        .bind(user_id)
        .bind(role)
        .bind(order_id)
        .fetch_one(self.pool)
        .await?;

        Ok(NotificationId::new(id))
    }

    /// Unread notifications for a user, including those sent to their role.
    /// Newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for(
        &self,
        user_id: UserId,
        role: Role,
    ) -> Result<Vec<Notification>, RepositoryError> {
        let rows = sqlx::query_as::<_, NotificationRow>(
            r"
            SELECT id, message, user_id, role, order_id, is_read, read_at, created_at
            FROM marketplace.notification
            WHERE user_id = $1 OR role = $2
            ORDER BY created_at DESC, id DESC
            ",
        )
        .bind(user_id)
        .bind(role)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Notification::from).collect())
    }

    /// Get a notification by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: NotificationId) -> Result<Option<Notification>, RepositoryError> {
        let row = sqlx::query_as::<_, NotificationRow>(
            r"
            SELECT id, message, user_id, role, order_id, is_read, read_at, created_at
            FROM marketplace.notification
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Notification::from))
    }

    /// Remove a notification once read.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete(&self, id: NotificationId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM marketplace.notification WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
