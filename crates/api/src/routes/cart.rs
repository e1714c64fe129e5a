//! Cart routes.
//!
//! Anonymous visitors send the `cartId` they were handed on their first add;
//! authenticated callers never need it.

use axum::extract::State;
use serde::Deserialize;
use tracing::instrument;

use marketplace_core::{CartId, ProductId};

use super::extract::{Json, Query};
use crate::error::Result;
use crate::middleware::OptionalAuth;
use crate::models::cart::CartView;
use crate::services::cart::CartService;
use crate::state::AppState;

/// `?cartId=` for anonymous callers.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartQuery {
    pub cart_id: Option<CartId>,
}

/// Add-to-cart body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub product_id: ProductId,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
    pub cart_id: Option<CartId>,
}

const fn default_quantity() -> i32 {
    1
}

/// Remove-from-cart body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveItemRequest {
    pub product_id: ProductId,
    pub cart_id: Option<CartId>,
}

/// Fetch the current cart.
///
/// GET /api/orders/cart?cartId=
#[instrument(skip(state, identity))]
pub async fn show(
    State(state): State<AppState>,
    OptionalAuth(identity): OptionalAuth,
    Query(query): Query<CartQuery>,
) -> Result<Json<CartView>> {
    let cart = CartService::new(state.pool())
        .get_cart(identity.as_ref(), query.cart_id)
        .await?;
    Ok(Json(cart))
}

/// Add a product to the cart.
///
/// POST /api/orders/cart
#[instrument(skip(state, identity))]
pub async fn add(
    State(state): State<AppState>,
    OptionalAuth(identity): OptionalAuth,
    Json(request): Json<AddItemRequest>,
) -> Result<Json<CartView>> {
    let cart = CartService::new(state.pool())
        .add_item(
            identity.as_ref(),
            request.cart_id,
            request.product_id,
            request.quantity,
        )
        .await?;
    Ok(Json(cart))
}

/// Remove a product from the cart.
///
/// DELETE /api/orders/cart
#[instrument(skip(state, identity))]
pub async fn remove(
    State(state): State<AppState>,
    OptionalAuth(identity): OptionalAuth,
    Json(request): Json<RemoveItemRequest>,
) -> Result<Json<CartView>> {
    let cart = CartService::new(state.pool())
        .remove_item(identity.as_ref(), request.cart_id, request.product_id)
        .await?;
    Ok(Json(cart))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_add_item_defaults_quantity() {
        let request: AddItemRequest = serde_json::from_str(r#"{"productId":7}"#).unwrap();
        assert_eq!(request.quantity, 1);
        assert_eq!(request.cart_id, None);
    }

    #[test]
    fn test_add_item_with_cart_id() {
        let request: AddItemRequest =
            serde_json::from_str(r#"{"productId":7,"quantity":3,"cartId":101}"#).unwrap();
        assert_eq!(request.product_id, ProductId::new(7));
        assert_eq!(request.cart_id, Some(CartId::new(101)));
    }
}
