//! Notification inbox routes.

use axum::{extract::State, http::StatusCode};

use marketplace_core::NotificationId;

use super::extract::{Json, Path};
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::notification::Notification;
use crate::services::messaging::MessagingService;
use crate::state::AppState;

/// GET /api/notifications
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
) -> Result<Json<Vec<Notification>>> {
    let notifications = MessagingService::new(state.pool())
        .list_notifications(&caller)
        .await?;
    Ok(Json(notifications))
}

/// POST /api/notifications/{id}/read
pub async fn mark_read(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Path(id): Path<NotificationId>,
) -> Result<StatusCode> {
    MessagingService::new(state.pool())
        .mark_read(&caller, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
