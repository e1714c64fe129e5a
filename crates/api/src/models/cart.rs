//! Cart domain types.

use rust_decimal::Decimal;
use serde::Serialize;

use marketplace_core::{CartId, ProductId, UserId, line_total, order_total};

/// A cart row. `user_id` is `None` for anonymous carts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cart {
    pub id: CartId,
    pub user_id: Option<UserId>,
}

/// One cart line with the product summary joined in.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: ProductId,
    pub name: String,
    pub price: Decimal,
    pub cover_image: Option<String>,
    pub seller_id: UserId,
    pub quantity: i32,
    pub line_total: Decimal,
}

impl CartLine {
    #[must_use]
    pub fn new(
        product_id: ProductId,
        name: String,
        price: Decimal,
        cover_image: Option<String>,
        seller_id: UserId,
        quantity: i32,
    ) -> Self {
        Self {
            product_id,
            name,
            price,
            cover_image,
            seller_id,
            quantity,
            line_total: line_total(price, quantity),
        }
    }
}

/// What the cart endpoints return.
///
/// `cart_id` is `None` when no cart exists yet; anonymous callers persist
/// it client-side and send it back on later calls.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub cart_id: Option<CartId>,
    pub items: Vec<CartLine>,
    pub total: Decimal,
}

impl CartView {
    /// The shape returned when there is no cart (or it has no items).
    #[must_use]
    pub const fn empty(cart_id: Option<CartId>) -> Self {
        Self {
            cart_id,
            items: Vec::new(),
            total: Decimal::ZERO,
        }
    }

    #[must_use]
    pub fn new(cart_id: CartId, items: Vec<CartLine>) -> Self {
        let total = order_total(items.iter().map(|line| (line.price, line.quantity)));
        Self {
            cart_id: Some(cart_id),
            items,
            total,
        }
    }
}
