//! Best-effort fan-out of notifications and emails.
//!
//! Nothing here returns an error: a failed insert or send is logged at
//! `warn` and the calling operation carries on.

use sqlx::PgPool;

use marketplace_core::{OrderId, SellerStatus};

use super::email::EmailService;
use crate::db::notifications::NotificationRepository;
use crate::models::notification::Recipient;
use crate::models::order::Order;

/// Sends UI notifications and, when SMTP is configured, emails.
pub struct Notifier<'a> {
    notifications: NotificationRepository<'a>,
    email: Option<&'a EmailService>,
}

impl<'a> Notifier<'a> {
    /// Create a notifier. `email` is `None` when SMTP is not configured.
    #[must_use]
    pub const fn new(pool: &'a PgPool, email: Option<&'a EmailService>) -> Self {
        Self {
            notifications: NotificationRepository::new(pool),
            email,
        }
    }

    /// Record a notification for a user or role.
    pub async fn notify(&self, recipient: Recipient, message: &str, order_id: Option<OrderId>) {
        if let Err(e) = self.notifications.create(recipient, message, order_id).await {
            tracing::warn!(error = %e, ?recipient, "Failed to record notification");
        }
    }

    /// Email the customer their order confirmation.
    pub async fn order_placed(&self, to: &str, name: &str, order: &Order) {
        let Some(email) = self.email else {
            tracing::debug!(order_number = %order.order_number, "SMTP not configured, skipping order email");
            return;
        };
        if let Err(e) = email.send_order_placed(to, name, order).await {
            tracing::warn!(error = %e, order_number = %order.order_number, "Failed to send order email");
        }
    }

    /// Email the customer that their payment was verified.
    pub async fn payment_confirmed(&self, to: &str, name: &str, order: &Order) {
        let Some(email) = self.email else {
            tracing::debug!(order_number = %order.order_number, "SMTP not configured, skipping payment email");
            return;
        };
        if let Err(e) = email.send_payment_confirmed(to, name, order).await {
            tracing::warn!(error = %e, order_number = %order.order_number, "Failed to send payment email");
        }
    }

    /// Email a seller about a status change.
    pub async fn seller_status(&self, to: &str, name: &str, status: SellerStatus, active: bool) {
        let Some(email) = self.email else {
            tracing::debug!(%status, "SMTP not configured, skipping seller email");
            return;
        };
        if let Err(e) = email.send_seller_status(to, name, status, active).await {
            tracing::warn!(error = %e, "Failed to send seller status email");
        }
    }
}
