//! Out-of-band payment confirmation.
//!
//! The customer asks for a per-order code, pays by mobile money quoting it,
//! and says so; an admin then verifies and marks the order paid. Stage
//! rules live in [`PaymentStage`]; this module adds ownership checks,
//! persistence and notifications.

use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use tracing::instrument;

use marketplace_core::{OrderId, PaymentStage, PaymentStageError, Role};

use super::ServiceError;
use super::email::EmailService;
use super::notifier::Notifier;
use super::orders::authorize_staff;
use crate::db::RepositoryError;
use crate::db::orders::OrderRepository;
use crate::models::Identity;
use crate::models::notification::Recipient;
use crate::models::order::Order;

/// What the customer needs in order to pay.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCode {
    pub order_id: OrderId,
    pub order_number: String,
    pub payment_code: String,
    pub total_price: Decimal,
    pub stage: PaymentStage,
    pub generated_at: Option<DateTime<Utc>>,
}

/// Payment workflow operations.
pub struct PaymentService<'a> {
    orders: OrderRepository<'a>,
    notifier: Notifier<'a>,
}

impl<'a> PaymentService<'a> {
    /// Create a new payment service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, email: Option<&'a EmailService>) -> Self {
        Self {
            orders: OrderRepository::new(pool),
            notifier: Notifier::new(pool, email),
        }
    }

    /// Issue the order's payment code, or return the one already issued.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the order does not exist.
    /// Returns `ServiceError::Forbidden` if the order belongs to someone else.
    /// Returns `ServiceError::Validation` if the order is already paid.
    #[instrument(skip(self, identity))]
    pub async fn generate_code(
        &self,
        identity: Option<&Identity>,
        order_id: OrderId,
    ) -> Result<PaymentCode, ServiceError> {
        let order = self.find(order_id).await?;
        authorize_customer(identity, &order)?;
        order.payment_stage().generate_code()?;

        let order = self
            .orders
            .issue_payment_code(order_id, &generate_payment_code(), identity.map(|i| i.user_id))
            .await?
            .ok_or(PaymentStageError::AlreadyPaid)?;

        let payment_code = order
            .payment_code
            .clone()
            .ok_or_else(|| ServiceError::validation("payment code was not stored"))?;

        Ok(PaymentCode {
            order_id: order.id,
            order_number: order.order_number.clone(),
            payment_code,
            total_price: order.total_price,
            stage: order.payment_stage(),
            generated_at: order.payment_code_generated_at,
        })
    }

    /// The customer asserts they have paid. Does not mark the order paid.
    ///
    /// Repeating the call on a client-confirmed order changes nothing.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the order does not exist.
    /// Returns `ServiceError::Forbidden` if the order belongs to someone else.
    /// Returns `ServiceError::Validation` if no code was issued or the order
    /// is already paid.
    #[instrument(skip(self, identity))]
    pub async fn confirm_client(
        &self,
        identity: Option<&Identity>,
        order_id: OrderId,
    ) -> Result<Order, ServiceError> {
        let order = self.find(order_id).await?;
        authorize_customer(identity, &order)?;

        let stage = order.payment_stage();
        stage.confirm_by_client()?;
        if stage == PaymentStage::ClientConfirmed {
            return Ok(order);
        }

        let order = self
            .orders
            .mark_client_confirmed(order_id, identity.map(|i| i.user_id))
            .await?
            .ok_or(PaymentStageError::AlreadyPaid)?;

        tracing::info!(order_id = %order.id, "Client confirmed payment");

        self.notifier
            .notify(
                Recipient::Role(Role::Admin),
                &format!(
                    "Payment for order {} ({}) needs verification",
                    order.order_number, order.total_price
                ),
                Some(order.id),
            )
            .await;

        Ok(order)
    }

    /// Final confirmation by an admin. The only transition that marks an
    /// order paid. Confirming twice leaves the order as it was and sends
    /// nothing the second time.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Forbidden` for non-admins.
    /// Returns `ServiceError::NotFound` if the order does not exist.
    #[instrument(skip(self, caller), fields(caller_id = %caller.user_id))]
    pub async fn confirm_admin(
        &self,
        caller: &Identity,
        order_id: OrderId,
    ) -> Result<Order, ServiceError> {
        if !caller.is_admin() {
            return Err(ServiceError::forbidden("only admins can confirm payments"));
        }
        self.mark_paid(caller, order_id).await
    }

    /// Dashboard shortcut: mark paid without the client step. Open to
    /// admins and to sellers with a line in the order.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Forbidden` for buyers and unrelated sellers.
    /// Returns `ServiceError::NotFound` if the order does not exist.
    #[instrument(skip(self, caller), fields(caller_id = %caller.user_id))]
    pub async fn confirm_order_payment(
        &self,
        caller: &Identity,
        order_id: OrderId,
    ) -> Result<Order, ServiceError> {
        let order = self.find(order_id).await?;
        authorize_staff(caller, &order)?;
        self.mark_paid(caller, order_id).await
    }

    async fn mark_paid(&self, caller: &Identity, order_id: OrderId) -> Result<Order, ServiceError> {
        let confirmation = self
            .orders
            .mark_admin_confirmed(order_id, caller.user_id)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => ServiceError::not_found("order"),
                other => other.into(),
            })?;
        let order = confirmation.order;

        if !confirmation.changed {
            tracing::debug!(order_id = %order.id, "Payment already confirmed");
            return Ok(order);
        }

        tracing::info!(order_id = %order.id, "Payment confirmed");

        if let Some(user_id) = order.user_id {
            self.notifier
                .notify(
                    Recipient::User(user_id),
                    &format!("Payment for order {} is confirmed", order.order_number),
                    Some(order.id),
                )
                .await;
        }
        if let Some(guest) = &order.guest_info {
            self.notifier
                .payment_confirmed(&guest.email, &guest.first_name, &order)
                .await;
        }

        Ok(order)
    }

    async fn find(&self, id: OrderId) -> Result<Order, ServiceError> {
        self.orders
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("order"))
    }
}

/// Who may drive the customer side of an order's payment.
///
/// Guest orders are reachable by anyone holding the order ID. Owned orders
/// require the owner or an admin; an anonymous caller is refused.
fn authorize_customer(identity: Option<&Identity>, order: &Order) -> Result<(), ServiceError> {
    let Some(owner) = order.user_id else {
        return Ok(());
    };
    match identity {
        Some(identity) if identity.may_access(Some(owner)) => Ok(()),
        _ => Err(ServiceError::forbidden("this order belongs to another user")),
    }
}

/// Random 6-digit payment code.
#[must_use]
pub fn generate_payment_code() -> String {
    let code: u32 = rand::rng().random_range(100_000..1_000_000);
    code.to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use marketplace_core::UserId;

    use super::*;
    use crate::models::order::tests::{item, order};

    fn identity(id: i32, role: Role) -> Identity {
        Identity {
            user_id: UserId::new(id),
            name: "Caller".to_string(),
            email: "caller@example.com".to_string(),
            role,
        }
    }

    fn owned_by(owner: Option<i32>) -> Order {
        let mut order = order(vec![item(1, 10, 500, 1)]);
        order.user_id = owner.map(UserId::new);
        order
    }

    #[test]
    fn test_generate_payment_code_format() {
        for _ in 0..100 {
            let code = generate_payment_code();
            assert_eq!(code.len(), 6);
            let value: u32 = code.parse().unwrap();
            assert!((100_000..1_000_000).contains(&value));
        }
    }

    #[test]
    fn test_owner_and_admin_may_pay() {
        let order = owned_by(Some(5));
        assert!(authorize_customer(Some(&identity(5, Role::Buyer)), &order).is_ok());
        assert!(authorize_customer(Some(&identity(1, Role::Admin)), &order).is_ok());
    }

    #[test]
    fn test_other_users_and_anonymous_refused_on_owned_order() {
        let order = owned_by(Some(5));
        assert!(matches!(
            authorize_customer(Some(&identity(6, Role::Buyer)), &order),
            Err(ServiceError::Forbidden(_))
        ));
        assert!(matches!(
            authorize_customer(None, &order),
            Err(ServiceError::Forbidden(_))
        ));
    }

    #[test]
    fn test_guest_order_open_to_anyone() {
        let order = owned_by(None);
        assert!(authorize_customer(None, &order).is_ok());
        assert!(authorize_customer(Some(&identity(6, Role::Buyer)), &order).is_ok());
    }

    #[test]
    fn test_stage_checks_follow_order_flags() {
        let mut order = owned_by(Some(5));
        assert_eq!(
            order.payment_stage().confirm_by_client(),
            Err(PaymentStageError::CodeNotGenerated)
        );

        order.payment_code = Some("123456".to_string());
        assert!(order.payment_stage().confirm_by_client().is_ok());

        order.is_paid = true;
        assert_eq!(
            order.payment_stage().generate_code(),
            Err(PaymentStageError::AlreadyPaid)
        );
    }
}
