//! Seller onboarding routes.

use axum::{extract::State, http::StatusCode};
use serde::Deserialize;
use tracing::instrument;

use marketplace_core::{SellerStatus, UserId};

use super::extract::{Json, Path, Query};
use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::models::user::User;
use crate::services::sellers::{SellerRequest, SellerService, SellerStatusUpdate};
use crate::state::AppState;

/// `?status=` filter for the admin listing.
#[derive(Debug, Default, Deserialize)]
pub struct SellerQuery {
    pub status: Option<SellerStatus>,
}

/// Apply to become a seller. The account starts `INACTIVE`.
///
/// POST /api/sellers/requests
#[instrument(skip(state, request))]
pub async fn request(
    State(state): State<AppState>,
    Json(request): Json<SellerRequest>,
) -> Result<(StatusCode, Json<User>)> {
    let seller = SellerService::new(state.pool(), state.email())
        .submit_request(request)
        .await?;
    Ok((StatusCode::CREATED, Json(seller)))
}

/// GET /api/sellers?status=
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(caller): RequireAdmin,
    Query(query): Query<SellerQuery>,
) -> Result<Json<Vec<User>>> {
    let sellers = SellerService::new(state.pool(), state.email())
        .list(&caller, query.status)
        .await?;
    Ok(Json(sellers))
}

/// Activate, suspend or deactivate a seller.
///
/// PUT /api/sellers/{id}/status
#[instrument(skip(state, caller))]
pub async fn update_status(
    State(state): State<AppState>,
    RequireAdmin(caller): RequireAdmin,
    Path(id): Path<UserId>,
    Json(update): Json<SellerStatusUpdate>,
) -> Result<Json<User>> {
    let seller = SellerService::new(state.pool(), state.email())
        .update_status(&caller, id, update)
        .await?;
    Ok(Json(seller))
}
