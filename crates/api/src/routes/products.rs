//! Product and review routes.

use axum::{extract::State, http::StatusCode};
use serde::Deserialize;
use tracing::instrument;

use marketplace_core::{CategoryId, ProductId};

use super::extract::{Json, Path, Query};
use crate::error::Result;
use crate::middleware::{OptionalAuth, RequireAuth, RequireStaff};
use crate::models::catalog::{Product, ProductDraft, ProductPatch, Review};
use crate::services::catalog::{CatalogService, NewReview};
use crate::state::AppState;

/// Listing filters.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuery {
    pub category_id: Option<CategoryId>,
    pub search: Option<String>,
}

/// Visible products.
///
/// GET /api/products?categoryId=&search=
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Vec<Product>>> {
    let products = CatalogService::new(state.pool())
        .list_products(query.category_id, query.search.as_deref())
        .await?;
    Ok(Json(products))
}

/// One product.
///
/// GET /api/products/{id}
pub async fn show(
    State(state): State<AppState>,
    OptionalAuth(identity): OptionalAuth,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>> {
    let product = CatalogService::new(state.pool())
        .get_product(identity.as_ref(), id)
        .await?;
    Ok(Json(product))
}

/// POST /api/products
#[instrument(skip(state, caller, draft))]
pub async fn create(
    State(state): State<AppState>,
    RequireStaff(caller): RequireStaff,
    Json(draft): Json<ProductDraft>,
) -> Result<(StatusCode, Json<Product>)> {
    let product = CatalogService::new(state.pool())
        .create_product(&caller, draft)
        .await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// PUT /api/products/{id}
#[instrument(skip(state, caller, patch))]
pub async fn update(
    State(state): State<AppState>,
    RequireStaff(caller): RequireStaff,
    Path(id): Path<ProductId>,
    Json(patch): Json<ProductPatch>,
) -> Result<Json<Product>> {
    let product = CatalogService::new(state.pool())
        .update_product(&caller, id, &patch)
        .await?;
    Ok(Json(product))
}

/// DELETE /api/products/{id}
#[instrument(skip(state, caller))]
pub async fn delete(
    State(state): State<AppState>,
    RequireStaff(caller): RequireStaff,
    Path(id): Path<ProductId>,
) -> Result<StatusCode> {
    CatalogService::new(state.pool())
        .delete_product(&caller, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/products/{id}/reviews
pub async fn reviews(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Vec<Review>>> {
    let reviews = CatalogService::new(state.pool()).list_reviews(id).await?;
    Ok(Json(reviews))
}

/// POST /api/products/{id}/reviews
#[instrument(skip(state, caller, review))]
pub async fn add_review(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Path(id): Path<ProductId>,
    Json(review): Json<NewReview>,
) -> Result<(StatusCode, Json<Review>)> {
    let review = CatalogService::new(state.pool())
        .add_review(&caller, id, review)
        .await?;
    Ok((StatusCode::CREATED, Json(review)))
}
