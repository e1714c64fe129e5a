//! Payment confirmation routes.

use axum::extract::State;
use tracing::instrument;

use marketplace_core::OrderId;

use super::extract::{Json, Path};
use crate::error::Result;
use crate::middleware::{OptionalAuth, RequireAdmin};
use crate::models::order::Order;
use crate::services::payments::{PaymentCode, PaymentService};
use crate::state::AppState;

/// Issue (or repeat) the order's payment code.
///
/// POST /api/payments/{order_id}/generate-code
#[instrument(skip(state, identity))]
pub async fn generate_code(
    State(state): State<AppState>,
    OptionalAuth(identity): OptionalAuth,
    Path(order_id): Path<OrderId>,
) -> Result<Json<PaymentCode>> {
    let code = PaymentService::new(state.pool(), state.email())
        .generate_code(identity.as_ref(), order_id)
        .await?;
    Ok(Json(code))
}

/// The customer reports having paid.
///
/// POST /api/payments/{order_id}/confirm-client
#[instrument(skip(state, identity))]
pub async fn confirm_client(
    State(state): State<AppState>,
    OptionalAuth(identity): OptionalAuth,
    Path(order_id): Path<OrderId>,
) -> Result<Json<Order>> {
    let order = PaymentService::new(state.pool(), state.email())
        .confirm_client(identity.as_ref(), order_id)
        .await?;
    Ok(Json(order))
}

/// Final verification by an admin.
///
/// POST /api/payments/{order_id}/confirm-admin
#[instrument(skip(state, caller))]
pub async fn confirm_admin(
    State(state): State<AppState>,
    RequireAdmin(caller): RequireAdmin,
    Path(order_id): Path<OrderId>,
) -> Result<Json<Order>> {
    let order = PaymentService::new(state.pool(), state.email())
        .confirm_admin(&caller, order_id)
        .await?;
    Ok(Json(order))
}
