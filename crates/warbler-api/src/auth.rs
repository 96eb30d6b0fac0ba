use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::error;
use uuid::Uuid;

use warbler_db::Database;
use warbler_db::models::{NewUser, SignupError};
use warbler_types::api::{Claims, LoginRequest, LoginResponse, SignupRequest, SignupResponse};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
}

pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    // Validate input
    if req.username.is_empty() || req.username.len() > 32 {
        return Err(StatusCode::BAD_REQUEST);
    }
    if req.email.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    // An empty password fails here, before any persistence is attempted.
    // Uniqueness of username/email is only checked at the insert below.
    let pending = match NewUser::signup(
        &req.username,
        &req.email,
        &req.password,
        req.image_url.as_deref(),
    ) {
        Ok(pending) => pending,
        Err(SignupError::EmptyPassword) => return Err(StatusCode::BAD_REQUEST),
        Err(SignupError::Hash(e)) => {
            error!("Password hashing failed: {}", e);
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    match state.db.insert_user(&pending) {
        Ok(()) => {}
        Err(e) if e.is_integrity() => return Err(StatusCode::CONFLICT),
        Err(e) => {
            error!("Signup insert failed: {}", e);
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    let user_id: Uuid = pending
        .id
        .parse()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let token = create_token(&state.jwt_secret, user_id, &req.username)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok((StatusCode::CREATED, Json(SignupResponse { user_id, token })))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    // `authenticate` treats a bad username and a bad password the same way:
    // Ok(None). Only system faults come back as Err.
    let user = state
        .db
        .authenticate(&req.username, &req.password)
        .map_err(|e| {
            error!("Login lookup failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let token = create_token(&state.jwt_secret, user_id, &user.username)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(LoginResponse {
        user_id,
        username: user.username,
        token,
    }))
}

fn create_token(secret: &str, user_id: Uuid, username: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
