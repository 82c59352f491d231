#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use civic_api::auth::jwt::{generate_access_token, JwtConfig};
use civic_api::config::ServerConfig;
use civic_api::router::build_app_router;
use civic_api::state::AppState;
use civic_core::permission::Requester;
use civic_core::roles::{PERMISSION_ADMIN_EVENT, ROLE_ADMIN, ROLE_SYSTEM_ADMIN, ROLE_USER};
use civic_core::types::DbId;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

const TEST_JWT_SECRET: &str = "test-secret-that-is-long-enough-for-hmac";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        jwt: JwtConfig {
            secret: TEST_JWT_SECRET.to_string(),
            access_token_expiry_mins: 15,
        },
        asset_base_url: "https://cdn.example.com/assets/".to_string(),
        chart_timezone: "Asia/Tokyo".to_string(),
        slow_call_threshold_ms: 500,
    }
}

/// The production router and middleware stack over `pool`.
pub fn build_test_app(pool: PgPool) -> Router {
    build_app_router(AppState::new(pool, test_config()))
}

// ---------------------------------------------------------------------------
// Callers
// ---------------------------------------------------------------------------

pub fn system_admin() -> Requester {
    Requester {
        user_id: 1,
        role: ROLE_SYSTEM_ADMIN.to_string(),
        permission_code: None,
        active_area_id: None,
    }
}

/// An `AD_EVT` admin bound to `area`.
pub fn area_admin(area: DbId) -> Requester {
    Requester {
        user_id: 2,
        role: ROLE_ADMIN.to_string(),
        permission_code: Some(PERMISSION_ADMIN_EVENT.to_string()),
        active_area_id: Some(area),
    }
}

pub fn resident() -> Requester {
    Requester {
        user_id: 3,
        role: ROLE_USER.to_string(),
        permission_code: None,
        active_area_id: None,
    }
}

pub fn token_for(requester: &Requester) -> String {
    generate_access_token(requester, &test_config().jwt).expect("token generation should succeed")
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

pub async fn send(
    app: Router,
    method: Method,
    uri: &str,
    caller: Option<&Requester>,
    body: Option<serde_json::Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(caller) = caller {
        builder = builder.header("authorization", format!("Bearer {}", token_for(caller)));
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str, caller: Option<&Requester>) -> Response<Body> {
    send(app, Method::GET, uri, caller, None).await
}

pub async fn post_json(
    app: Router,
    uri: &str,
    caller: Option<&Requester>,
    body: serde_json::Value,
) -> Response<Body> {
    send(app, Method::POST, uri, caller, Some(body)).await
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub async fn create_area(pool: &PgPool, name: &str) -> DbId {
    sqlx::query_scalar("INSERT INTO active_areas (name) VALUES ($1) RETURNING id")
        .bind(name)
        .fetch_one(pool)
        .await
        .unwrap()
}

/// Create an event through the API as a system admin and return its JSON.
pub async fn create_event(pool: &PgPool, body: serde_json::Value) -> serde_json::Value {
    let response = post_json(
        build_test_app(pool.clone()),
        "/api/v1/events",
        Some(&system_admin()),
        body,
    )
    .await;
    assert_eq!(response.status(), axum::http::StatusCode::CREATED);
    body_json(response).await["data"].clone()
}

pub async fn ledger_kinds(pool: &PgPool, event_id: DbId) -> Vec<String> {
    sqlx::query_scalar("SELECT kind FROM transactions WHERE event_id = $1 ORDER BY id")
        .bind(event_id)
        .fetch_all(pool)
        .await
        .unwrap()
}
