use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::error;
use uuid::Uuid;

use warbler_db::models::UserRow;
use warbler_types::api::{Claims, MessageResponse, UserDetailResponse, UserResponse};

use crate::auth::AppState;
use crate::found;
use crate::messages::{message_response, parse_uuid};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Optional username substring filter.
    pub q: Option<String>,
}

pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    let rows = state
        .db
        .list_users(query.q.as_deref())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let users: Vec<UserResponse> = rows.into_iter().map(user_response).collect();
    Ok(Json(users))
}

pub async fn show_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, StatusCode> {
    let row = state
        .db
        .get_user_by_id(&user_id.to_string())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    let messages = state
        .db
        .messages_for_user(&row.id)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(UserDetailResponse {
        user: user_response(row),
        messages: messages.into_iter().map(message_response).collect(),
    }))
}

pub async fn followers(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    require_user(&state, user_id)?;

    let rows = state
        .db
        .followers(&user_id.to_string())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let users: Vec<UserResponse> = rows.into_iter().map(user_response).collect();
    Ok(Json(users))
}

pub async fn following(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    require_user(&state, user_id)?;

    let rows = state
        .db
        .following(&user_id.to_string())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let users: Vec<UserResponse> = rows.into_iter().map(user_response).collect();
    Ok(Json(users))
}

pub async fn likes(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    require_user(&state, user_id)?;

    let rows = state
        .db
        .likes_for_user(&user_id.to_string())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let messages: Vec<MessageResponse> = rows.into_iter().map(message_response).collect();
    Ok(Json(messages))
}

pub async fn add_follow(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<Response, StatusCode> {
    require_user(&state, user_id)?;

    match state.db.follow(&claims.sub.to_string(), &user_id.to_string()) {
        Ok(()) => {}
        // Re-following an already-followed user is a no-op
        Err(e) if e.is_integrity() => {}
        Err(e) => {
            error!("Follow insert failed: {}", e);
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    Ok(found(&format!("/users/{}/following", claims.sub)))
}

pub async fn stop_following(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<Response, StatusCode> {
    require_user(&state, user_id)?;

    state
        .db
        .unfollow(&claims.sub.to_string(), &user_id.to_string())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(found(&format!("/users/{}/following", claims.sub)))
}

/// Any session user may toggle a like on any message: if the edge already
/// exists it is removed, otherwise created.
pub async fn add_like(
    State(state): State<AppState>,
    Path(message_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<Response, StatusCode> {
    state
        .db
        .get_message(&message_id.to_string())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    state
        .db
        .toggle_like(
            &Uuid::new_v4().to_string(),
            &claims.sub.to_string(),
            &message_id.to_string(),
        )
        .map_err(|e| {
            error!("Like toggle failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Ok(found("/"))
}

/// Delete the session user's own account. Messages, likes, and follow
/// edges cascade away with it.
pub async fn delete_account(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Response, StatusCode> {
    state
        .db
        .delete_user(&claims.sub.to_string())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(found("/signup"))
}

pub(crate) fn user_response(row: UserRow) -> UserResponse {
    let id = parse_uuid(&row.id, "user id");

    UserResponse {
        id,
        username: row.username,
        email: row.email,
        image_url: row.image_url,
        header_image_url: row.header_image_url,
        bio: row.bio,
        location: row.location,
    }
}

fn require_user(state: &AppState, user_id: Uuid) -> Result<(), StatusCode> {
    state
        .db
        .get_user_by_id(&user_id.to_string())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;
    Ok(())
}
