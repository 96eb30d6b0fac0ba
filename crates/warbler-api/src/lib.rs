pub mod auth;
pub mod messages;
pub mod middleware;
pub mod routes;
pub mod users;

pub use auth::{AppState, AppStateInner};
pub use routes::router;

use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};

/// 302 Found with a Location header — the redirect contract the original
/// server-rendered flows promise after mutations.
pub(crate) fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}
