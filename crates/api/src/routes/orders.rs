//! Order routes.

use axum::{extract::State, http::StatusCode};
use tracing::instrument;

use marketplace_core::OrderId;

use super::extract::{Json, Path};
use crate::error::Result;
use crate::middleware::{OptionalAuth, RequireAdmin, RequireAuth, RequireStaff};
use crate::models::event::DomainEvent;
use crate::models::order::{Order, OrderPatch, StatusUpdate};
use crate::services::orders::{DirectOrder, OrderService, PlaceOrder};
use crate::services::payments::PaymentService;
use crate::state::AppState;

/// Check out the caller's cart. Guests send `guestInfo` and `cartId`.
///
/// POST /api/orders
#[instrument(skip(state, identity, request))]
pub async fn place(
    State(state): State<AppState>,
    OptionalAuth(identity): OptionalAuth,
    Json(request): Json<PlaceOrder>,
) -> Result<(StatusCode, Json<Order>)> {
    let order = OrderService::new(state.pool(), state.email())
        .place_order(identity.as_ref(), request)
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// Create an order on a user's behalf.
///
/// POST /api/orders/create
#[instrument(skip(state, caller, request))]
pub async fn create(
    State(state): State<AppState>,
    RequireStaff(caller): RequireStaff,
    Json(request): Json<DirectOrder>,
) -> Result<(StatusCode, Json<Order>)> {
    let order = OrderService::new(state.pool(), state.email())
        .create_order(&caller, request)
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// The caller's own orders.
///
/// GET /api/orders, GET /api/orders/mine
pub async fn mine(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
) -> Result<Json<Vec<Order>>> {
    let orders = OrderService::new(state.pool(), state.email())
        .my_orders(&caller)
        .await?;
    Ok(Json(orders))
}

/// Every order the caller may see.
///
/// GET /api/orders/all
pub async fn all(
    State(state): State<AppState>,
    RequireStaff(caller): RequireStaff,
) -> Result<Json<Vec<Order>>> {
    let orders = OrderService::new(state.pool(), state.email())
        .get_all_orders(&caller)
        .await?;
    Ok(Json(orders))
}

/// One order.
///
/// GET /api/orders/{id}
pub async fn show(
    State(state): State<AppState>,
    RequireStaff(caller): RequireStaff,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    let order = OrderService::new(state.pool(), state.email())
        .get_order(&caller, id)
        .await?;
    Ok(Json(order))
}

/// Edit an order.
///
/// PUT /api/orders/{id}
#[instrument(skip(state, caller, patch))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(caller): RequireAdmin,
    Path(id): Path<OrderId>,
    Json(patch): Json<OrderPatch>,
) -> Result<Json<Order>> {
    let order = OrderService::new(state.pool(), state.email())
        .update_order(&caller, id, &patch)
        .await?;
    Ok(Json(order))
}

/// Delete an order and its items.
///
/// DELETE /api/orders/{id}
#[instrument(skip(state, caller))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(caller): RequireAdmin,
    Path(id): Path<OrderId>,
) -> Result<StatusCode> {
    OrderService::new(state.pool(), state.email())
        .delete_order(&caller, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Set delivery / payment flags.
///
/// PUT /api/orders/{id}/status
#[instrument(skip(state, caller))]
pub async fn update_status(
    State(state): State<AppState>,
    RequireStaff(caller): RequireStaff,
    Path(id): Path<OrderId>,
    Json(update): Json<StatusUpdate>,
) -> Result<Json<Order>> {
    let order = OrderService::new(state.pool(), state.email())
        .update_status(&caller, id, update)
        .await?;
    Ok(Json(order))
}

/// Mark an order paid from the dashboard.
///
/// PUT /api/orders/{id}/confirm-payment
#[instrument(skip(state, caller))]
pub async fn confirm_payment(
    State(state): State<AppState>,
    RequireStaff(caller): RequireStaff,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    let order = PaymentService::new(state.pool(), state.email())
        .confirm_order_payment(&caller, id)
        .await?;
    Ok(Json(order))
}

/// Durable event history of an order.
///
/// GET /api/orders/{id}/events
pub async fn events(
    State(state): State<AppState>,
    RequireAdmin(caller): RequireAdmin,
    Path(id): Path<OrderId>,
) -> Result<Json<Vec<DomainEvent>>> {
    let events = OrderService::new(state.pool(), state.email())
        .events(&caller, id)
        .await?;
    Ok(Json(events))
}
