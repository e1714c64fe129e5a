//! Authentication routes.

use axum::{extract::State, http::StatusCode};
use serde::Deserialize;
use tracing::instrument;

use super::extract::Json;
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::Identity;
use crate::services::auth::{AuthService, Session};
use crate::state::AppState;

/// Registration form.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Login form.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Register a buyer and return a token.
///
/// POST /api/auth/register
#[instrument(skip(state, request))]
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Session>)> {
    let session = AuthService::new(state.pool(), state.tokens())
        .register(&request.name, &request.email, &request.password)
        .await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// Exchange email and password for a token.
///
/// POST /api/auth/login
#[instrument(skip(state, request))]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<Session>> {
    let session = AuthService::new(state.pool(), state.tokens())
        .login(&request.email, &request.password)
        .await?;
    Ok(Json(session))
}

/// The identity carried by the caller's token.
///
/// GET /api/auth/me
pub async fn me(RequireAuth(identity): RequireAuth) -> Json<Identity> {
    Json(identity)
}
