//! Durable domain events.

use chrono::{DateTime, Utc};
use serde::Serialize;

use marketplace_core::{DomainEventId, OrderId, UserId};

/// Kinds of event appended to the domain event log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    OrderPlaced,
    OrderCreated,
    OrderUpdated,
    OrderDeleted,
    PaymentCodeGenerated,
    PaymentClientConfirmed,
    PaymentAdminConfirmed,
    SellerStatusChanged,
}

impl EventKind {
    /// Dotted name stored in `domain_event.event_type`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OrderPlaced => "order.placed",
            Self::OrderCreated => "order.created",
            Self::OrderUpdated => "order.updated",
            Self::OrderDeleted => "order.deleted",
            Self::PaymentCodeGenerated => "payment.code_generated",
            Self::PaymentClientConfirmed => "payment.client_confirmed",
            Self::PaymentAdminConfirmed => "payment.admin_confirmed",
            Self::SellerStatusChanged => "seller.status_changed",
        }
    }
}

/// An event about to be appended.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub kind: EventKind,
    pub order_id: Option<OrderId>,
    pub actor_id: Option<UserId>,
    pub payload: serde_json::Value,
}

impl NewEvent {
    /// An event not tied to an order.
    #[must_use]
    pub fn new(kind: EventKind, actor_id: Option<UserId>) -> Self {
        Self {
            kind,
            order_id: None,
            actor_id,
            payload: serde_json::Value::Object(serde_json::Map::new()),
        }
    }

    /// An event about one order.
    #[must_use]
    pub fn for_order(kind: EventKind, order_id: OrderId, actor_id: Option<UserId>) -> Self {
        Self {
            order_id: Some(order_id),
            ..Self::new(kind, actor_id)
        }
    }

    #[must_use]
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

/// A stored event.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainEvent {
    pub id: DomainEventId,
    pub event_type: String,
    pub order_id: Option<OrderId>,
    pub actor_id: Option<UserId>,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
