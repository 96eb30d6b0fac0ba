use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{error, warn};
use uuid::Uuid;

use warbler_db::models::MessageRow;
use warbler_types::api::{Claims, MessageResponse, NewMessageRequest};

use crate::auth::AppState;
use crate::found;

/// Warbles are short. Same cap as the original.
const MAX_MESSAGE_LEN: usize = 140;

pub async fn create_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<NewMessageRequest>,
) -> Result<Response, StatusCode> {
    if req.text.is_empty() || req.text.chars().count() > MAX_MESSAGE_LEN {
        return Err(StatusCode::BAD_REQUEST);
    }

    let message_id = Uuid::new_v4();
    state
        .db
        .insert_message(&message_id.to_string(), &claims.sub.to_string(), &req.text)
        .map_err(|e| {
            error!("Message insert failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Ok(found(&format!("/users/{}", claims.sub)))
}

pub async fn show_message(
    State(state): State<AppState>,
    Path(message_id): Path<Uuid>,
) -> Result<impl IntoResponse, StatusCode> {
    let row = state
        .db
        .get_message(&message_id.to_string())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(message_response(row)))
}

/// Deleting a message is allowed only for its owner. A non-owner attempt
/// mutates nothing but still answers with the usual redirect, never a 403.
pub async fn delete_message(
    State(state): State<AppState>,
    Path(message_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<Response, StatusCode> {
    let row = state
        .db
        .get_message(&message_id.to_string())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    if row.user_id == claims.sub.to_string() {
        state
            .db
            .delete_message(&row.id)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    } else {
        warn!(
            "User {} attempted to delete message {} owned by {}",
            claims.sub, row.id, row.user_id
        );
    }

    Ok(found(&format!("/users/{}", claims.sub)))
}

/// Home timeline: the session user's own messages plus those of everyone
/// they follow, newest first.
pub async fn timeline(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let rows = state
        .db
        .timeline(&claims.sub.to_string(), 100)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let messages: Vec<MessageResponse> = rows.into_iter().map(message_response).collect();
    Ok(Json(messages))
}

pub(crate) fn message_response(row: MessageRow) -> MessageResponse {
    let id = parse_uuid(&row.id, "message id");
    let user_id = parse_uuid(&row.user_id, "user id");
    let created_at = parse_timestamp(&row.created_at, &row.id);

    MessageResponse {
        id,
        user_id,
        username: row.username,
        text: row.text,
        created_at,
    }
}

pub(crate) fn parse_uuid(raw: &str, what: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}': {}", what, raw, e);
        Uuid::default()
    })
}

fn parse_timestamp(raw: &str, message_id: &str) -> chrono::DateTime<chrono::Utc> {
    raw.parse::<chrono::DateTime<chrono::Utc>>()
        .or_else(|_| {
            // SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without
            // timezone. Parse as naive UTC and convert.
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt created_at '{}' on message '{}': {}", raw, message_id, e);
            chrono::DateTime::default()
        })
}
