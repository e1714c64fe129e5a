//! Order domain types.
//!
//! An order is a snapshot: each item carries the product name, seller and
//! unit price captured when the order was written.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use marketplace_core::{GuestInfo, OrderId, OrderItemId, PaymentStage, ProductId, UserId};

/// A persisted order with its items.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    pub user_id: Option<UserId>,
    pub guest_info: Option<GuestInfo>,
    pub shipping_address: serde_json::Value,
    pub payment_method: String,
    pub total_price: Decimal,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub is_delivered: bool,
    pub delivered_at: Option<DateTime<Utc>>,
    pub is_confirmed_by_admin: bool,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub client_confirmed_payment: bool,
    pub client_confirmed_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub payment_code: Option<String>,
    pub payment_code_generated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
}

impl Order {
    /// Current stage of the payment workflow.
    #[must_use]
    pub const fn payment_stage(&self) -> PaymentStage {
        PaymentStage::from_flags(
            self.is_paid,
            self.is_confirmed_by_admin,
            self.client_confirmed_payment,
            self.payment_code.is_some(),
        )
    }

    /// Email address for customer-facing messages.
    #[must_use]
    pub fn guest_email(&self) -> Option<&str> {
        self.guest_info.as_ref().map(|g| g.email.as_str())
    }

    /// Whether any item belongs to `seller`.
    #[must_use]
    pub fn has_items_from(&self, seller: UserId) -> bool {
        self.items.iter().any(|item| item.seller_id == Some(seller))
    }

    /// Restrict the order to the lines sold by `seller`.
    ///
    /// Returns `None` when the order contains nothing from that seller, so
    /// a seller never sees another seller's lines in a shared order.
    #[must_use]
    pub fn scoped_to_seller(mut self, seller: UserId) -> Option<Self> {
        self.items.retain(|item| item.seller_id == Some(seller));
        if self.items.is_empty() {
            None
        } else {
            Some(self)
        }
    }
}

/// One line of an order. Immutable after creation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: Option<ProductId>,
    pub seller_id: Option<UserId>,
    pub product_name: String,
    pub quantity: i32,
    pub price: Decimal,
}

/// Everything needed to insert an order and its items.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_number: String,
    pub user_id: Option<UserId>,
    pub guest_info: Option<GuestInfo>,
    pub shipping_address: serde_json::Value,
    pub payment_method: String,
    pub total_price: Decimal,
    pub items: Vec<NewOrderItem>,
}

/// An order line before insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub seller_id: UserId,
    pub product_name: String,
    pub quantity: i32,
    pub price: Decimal,
}

/// Admin edit of an order. Absent fields are left unchanged; items are
/// never edited.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPatch {
    pub shipping_address: Option<serde_json::Value>,
    pub payment_method: Option<String>,
    pub is_paid: Option<bool>,
    pub is_delivered: Option<bool>,
}

/// Status flags settable from the order-management dashboard.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub is_paid: Option<bool>,
    pub is_delivered: Option<bool>,
}

impl From<StatusUpdate> for OrderPatch {
    fn from(update: StatusUpdate) -> Self {
        Self {
            is_paid: update.is_paid,
            is_delivered: update.is_delivered,
            ..Self::default()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn item(id: i32, seller: i32, price_cents: i64, quantity: i32) -> OrderItem {
        OrderItem {
            id: OrderItemId::new(id),
            order_id: OrderId::new(1),
            product_id: Some(ProductId::new(id)),
            seller_id: Some(UserId::new(seller)),
            product_name: format!("product {id}"),
            quantity,
            price: Decimal::new(price_cents, 2),
        }
    }

    pub(crate) fn order(items: Vec<OrderItem>) -> Order {
        let now = Utc::now();
        Order {
            id: OrderId::new(1),
            order_number: "ORD-20260101000000-ABC123".to_string(),
            user_id: Some(UserId::new(10)),
            guest_info: None,
            shipping_address: serde_json::json!({"city": "Kigali"}),
            payment_method: "mobile_money".to_string(),
            total_price: Decimal::ZERO,
            is_paid: false,
            paid_at: None,
            is_delivered: false,
            delivered_at: None,
            is_confirmed_by_admin: false,
            confirmed_at: None,
            client_confirmed_payment: false,
            client_confirmed_at: None,
            payment_code: None,
            payment_code_generated_at: None,
            created_at: now,
            updated_at: now,
            items,
        }
    }

    #[test]
    fn test_scoped_to_seller_filters_items() {
        let shared = order(vec![item(1, 2, 1000, 1), item(2, 3, 500, 2), item(3, 2, 100, 1)]);
        let scoped = shared.scoped_to_seller(UserId::new(2)).unwrap();
        assert_eq!(scoped.items.len(), 2);
        assert!(scoped.items.iter().all(|i| i.seller_id == Some(UserId::new(2))));
    }

    #[test]
    fn test_scoped_to_seller_none_without_items() {
        let other = order(vec![item(1, 3, 1000, 1)]);
        assert!(!other.has_items_from(UserId::new(2)));
        assert!(other.scoped_to_seller(UserId::new(2)).is_none());
    }

    #[test]
    fn test_payment_stage_follows_flags() {
        let mut o = order(vec![]);
        assert_eq!(o.payment_stage(), PaymentStage::Pending);
        o.payment_code = Some("123456".to_string());
        assert_eq!(o.payment_stage(), PaymentStage::CodeGenerated);
        o.is_paid = true;
        assert_eq!(o.payment_stage(), PaymentStage::AdminConfirmed);
    }

    #[test]
    fn test_payment_code_not_serialized() {
        let mut o = order(vec![]);
        o.payment_code = Some("654321".to_string());
        let json = serde_json::to_string(&o).unwrap();
        assert!(!json.contains("654321"));
        assert!(json.contains("\"orderNumber\""));
    }
}
