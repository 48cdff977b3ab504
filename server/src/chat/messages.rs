//! REST endpoints for sending messages and fetching history.
//!
//! Sending persists through the store and then hands the created message to
//! the router for live delivery. The HTTP response carries the created
//! message back to the sender, so live fan-out never needs to target the
//! sender's own connection.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::auth::middleware::Claims;
use crate::chat::router;
use crate::chat::types::{Message, NewMessage};
use crate::error::ServerError;
use crate::ids::{GroupId, UserId};
use crate::state::AppState;

/// Maximum message text length (chars).
const MAX_TEXT_LENGTH: usize = 2000;

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub text: Option<String>,
    pub image: Option<String>,
}

/// Normalize and validate a send request body: trim the text, require at
/// least one of text/image, cap the text length.
fn validate_body(
    body: &SendMessageRequest,
) -> Result<(Option<String>, Option<String>), ServerError> {
    let text = body
        .text
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from);
    let image = body.image.clone().filter(|i| !i.is_empty());

    if text.is_none() && image.is_none() {
        return Err(ServerError::BadRequest(
            "message needs text or an image".to_string(),
        ));
    }
    if let Some(text) = &text {
        let len = text.chars().count();
        if len > MAX_TEXT_LENGTH {
            return Err(ServerError::PayloadTooLarge {
                len,
                max: MAX_TEXT_LENGTH,
            });
        }
    }

    Ok((text, image))
}

/// POST /api/messages/{receiver_id} — send a direct message. JWT auth required.
pub async fn send_direct_message(
    State(state): State<AppState>,
    claims: Claims,
    Path(receiver_id): Path<UserId>,
    Json(body): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<Message>), ServerError> {
    let (text, image) = validate_body(&body)?;

    let mut new = NewMessage::direct(claims.user_id(), receiver_id);
    new.text = text;
    new.image = image;

    let message = state.store.create(new).await?;
    router::deliver_new_message(&state, &message);

    Ok((StatusCode::CREATED, Json(message)))
}

/// POST /api/groups/{group_id}/messages — send a group message. JWT auth required.
pub async fn send_group_message(
    State(state): State<AppState>,
    claims: Claims,
    Path(group_id): Path<GroupId>,
    Json(body): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<Message>), ServerError> {
    let (text, image) = validate_body(&body)?;

    let mut new = NewMessage::group(claims.user_id(), group_id);
    new.text = text;
    new.image = image;

    let message = state.store.create(new).await?;
    router::deliver_new_message(&state, &message);

    Ok((StatusCode::CREATED, Json(message)))
}

/// GET /api/messages/{other_id} — direct-message history with another user,
/// both directions, oldest first. JWT auth required.
pub async fn get_direct_history(
    State(state): State<AppState>,
    claims: Claims,
    Path(other_id): Path<UserId>,
) -> Result<Json<Vec<Message>>, ServerError> {
    let history = state.store.direct_history(&claims.user_id(), &other_id).await?;
    Ok(Json(history))
}

/// GET /api/groups/{group_id}/messages — group history, oldest first.
/// JWT auth required.
pub async fn get_group_history(
    State(state): State<AppState>,
    _claims: Claims,
    Path(group_id): Path<GroupId>,
) -> Result<Json<Vec<Message>>, ServerError> {
    let history = state.store.group_history(&group_id).await?;
    Ok(Json(history))
}
