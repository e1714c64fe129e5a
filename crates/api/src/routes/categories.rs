//! Category routes.

use axum::{extract::State, http::StatusCode};

use super::extract::Json;
use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::models::catalog::Category;
use crate::services::catalog::{CatalogService, NewCategory};
use crate::state::AppState;

/// GET /api/categories
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    let categories = CatalogService::new(state.pool()).list_categories().await?;
    Ok(Json(categories))
}

/// POST /api/categories
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(caller): RequireAdmin,
    Json(category): Json<NewCategory>,
) -> Result<(StatusCode, Json<Category>)> {
    let category = CatalogService::new(state.pool())
        .create_category(&caller, category)
        .await?;
    Ok((StatusCode::CREATED, Json(category)))
}
