use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::NamedTempFile;
use tower::ServiceExt;

use chatlink::config::AppConfig;
use chatlink::database::{init_db, AppState};
use chatlink::route::create_app;

fn setup_test_app(api_secret: Option<&str>) -> (axum::Router, NamedTempFile) {
    let temp_db = NamedTempFile::new().expect("Failed to create temp file");
    let db_path = temp_db.path().to_str().unwrap();
    let db = init_db(db_path).expect("Failed to initialize test database");
    let config = AppConfig {
        api_secret: api_secret.map(str::to_string),
        ..AppConfig::default()
    };
    (create_app(AppState::new(db, config)), temp_db)
}

/// Helper function to parse response body as JSON
async fn response_json(body: Body) -> Value {
    let bytes = body
        .collect()
        .await
        .expect("Failed to read response body")
        .to_bytes();

    serde_json::from_slice(&bytes).expect("Failed to parse JSON")
}

fn create_request(authorization: Option<&str>) -> Request<Body> {
    let payload = json!({
        "target": "https://example.com/auth-test",
        "creator": "tester"
    });

    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/links")
        .header("content-type", "application/json");
    if let Some(value) = authorization {
        builder = builder.header("Authorization", value);
    }
    builder.body(Body::from(payload.to_string())).unwrap()
}

#[tokio::test]
async fn test_auth_middleware_enabled_valid_token() {
    let (app, _temp_db) = setup_test_app(Some("secret_token"));

    let response = app.oneshot(create_request(Some("secret_token"))).await.unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_auth_middleware_enabled_invalid_token() {
    let (app, _temp_db) = setup_test_app(Some("secret_token"));

    let response = app.oneshot(create_request(Some("wrong_token"))).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = response_json(response.into_body()).await;
    assert_eq!(body["error"], "Unauthorized");
    assert_eq!(body["message"], "Invalid or missing authorization header");
}

#[tokio::test]
async fn test_auth_middleware_enabled_no_token() {
    let (app, _temp_db) = setup_test_app(Some("secret_token"));

    let response = app.oneshot(create_request(None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = response_json(response.into_body()).await;
    assert_eq!(body["error"], "Unauthorized");
    assert_eq!(body["message"], "Invalid or missing authorization header");
}

#[tokio::test]
async fn test_auth_middleware_disabled() {
    let (app, _temp_db) = setup_test_app(None);

    let response = app.oneshot(create_request(None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_auth_does_not_guard_redirects() {
    let (app, _temp_db) = setup_test_app(Some("secret_token"));

    let response = app
        .clone()
        .oneshot(create_request(Some("secret_token")))
        .await
        .unwrap();
    let body = response_json(response.into_body()).await;
    let path = body["path"].as_str().unwrap().to_string();

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/{path}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
}
