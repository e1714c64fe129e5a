//! Direct messages between users.

use axum::{extract::State, http::StatusCode};

use marketplace_core::UserId;

use super::extract::{Json, Path};
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::chat::ChatMessage;
use crate::services::messaging::{MessagingService, NewChatMessage};
use crate::state::AppState;

/// POST /api/chat/messages
pub async fn send(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Json(message): Json<NewChatMessage>,
) -> Result<(StatusCode, Json<ChatMessage>)> {
    let message = MessagingService::new(state.pool())
        .send(&caller, message)
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// GET /api/chat/{user_id}
pub async fn conversation(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Path(other): Path<UserId>,
) -> Result<Json<Vec<ChatMessage>>> {
    let messages = MessagingService::new(state.pool())
        .conversation(&caller, other)
        .await?;
    Ok(Json(messages))
}
