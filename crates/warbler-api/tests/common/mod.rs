use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, Response, header};
use serde_json::Value;
use tower::ServiceExt;

use warbler_api::{AppState, AppStateInner, router};
use warbler_db::Database;

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

/// Fresh app over an in-memory database. Each test gets its own.
pub fn test_app() -> TestApp {
    let db = Database::open_in_memory().unwrap();
    let state: AppState = Arc::new(AppStateInner {
        db,
        jwt_secret: "test-secret".into(),
    });

    TestApp {
        router: router(state.clone()),
        state,
    }
}

impl TestApp {
    pub async fn get(&self, uri: &str, token: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let req = builder.body(Body::empty()).unwrap();
        self.router.clone().oneshot(req).await.unwrap()
    }

    pub async fn post(&self, uri: &str, token: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().method("POST").uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let req = builder.body(Body::empty()).unwrap();
        self.router.clone().oneshot(req).await.unwrap()
    }

    pub async fn post_json(&self, uri: &str, token: Option<&str>, body: Value) -> Response<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let req = builder.body(Body::from(body.to_string())).unwrap();
        self.router.clone().oneshot(req).await.unwrap()
    }

    /// Sign up a user through the route and hand back (user_id, session token).
    pub async fn signup(&self, username: &str, email: &str, password: &str) -> (String, String) {
        let resp = self
            .post_json(
                "/signup",
                None,
                serde_json::json!({
                    "username": username,
                    "email": email,
                    "password": password,
                }),
            )
            .await;
        assert_eq!(resp.status(), axum::http::StatusCode::CREATED);

        let body = body_json(resp).await;
        (
            body["user_id"].as_str().unwrap().to_string(),
            body["token"].as_str().unwrap().to_string(),
        )
    }
}

pub async fn body_string(resp: Response<Body>) -> String {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(resp: Response<Body>) -> Value {
    serde_json::from_str(&body_string(resp).await).unwrap()
}
