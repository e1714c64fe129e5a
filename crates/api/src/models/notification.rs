//! Ephemeral UI notifications.

use chrono::{DateTime, Utc};
use serde::Serialize;

use marketplace_core::{NotificationId, OrderId, Role, UserId};

/// Who a notification is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    /// One user.
    User(UserId),
    /// Every user holding the role.
    Role(Role),
}

/// A notification row. Deleted once read; see the domain event log for
/// the durable history.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: NotificationId,
    pub message: String,
    pub user_id: Option<UserId>,
    pub role: Option<Role>,
    pub order_id: Option<OrderId>,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Whether the notification is addressed to this user or role.
    #[must_use]
    pub fn is_for(&self, user_id: UserId, role: Role) -> bool {
        self.user_id == Some(user_id) || self.role == Some(role)
    }
}
