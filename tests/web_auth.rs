//! Integration tests for the login/logout endpoints and the bearer gate

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt; // for .collect().await
use serde_json::{Value, json};
use std::sync::Arc;
use task_app::auth::{InMemoryCredentials, ManualClock, RevocationStore, TokenCodec};
use task_app::config::UserEntry;
use task_app::web::{AppStateInner, create_router};
use tower::util::ServiceExt; // for `oneshot`

const START: i64 = 1_700_000_000;

fn test_app() -> (axum::Router, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(START));
    let codec = TokenCodec::new(b"integration-test-secret-0123456789", RevocationStore::new())
        .with_clock(clock.clone());
    let credentials = InMemoryCredentials::new([
        UserEntry { id: 42, email: "a@x.com".into(), password: "password".into() },
        UserEntry { id: 7, email: "b@x.com".into(), password: "hunter2".into() },
    ]);
    let state = Arc::new(AppStateInner {
        codec,
        credentials: Box::new(credentials),
    });
    (create_router(state), clock)
}

async fn send(app: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

fn login_request(body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/users/login")
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap()
}

fn me_request(authorization: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri("/users/me");
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    builder.body(Body::empty()).unwrap()
}

fn logout_request(token: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method("POST")
        .uri("/users/logout")
        .header(header::AUTHORIZATION, format!("Bearer {}", token));
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn login(app: &axum::Router, email: &str, password: &str) -> String {
    let payload = json!({ "email": email, "password": password });
    let (status, json) = send(app, login_request(payload.to_string())).await;
    assert_eq!(status, StatusCode::OK);
    json["data"]["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_login_success() {
    let (app, _) = test_app();
    let payload = json!({ "email": "a@x.com", "password": "password" });
    let (status, json) = send(&app, login_request(payload.to_string())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["error"], false);
    assert_eq!(json["data"]["user"], json!({ "id": 42, "email": "a@x.com" }));
    assert!(json["data"]["token"].as_str().unwrap().split('.').count() == 3);
}

#[tokio::test]
async fn test_login_wrong_password() {
    let (app, _) = test_app();
    let payload = json!({ "email": "a@x.com", "password": "wrong" });
    let (status, json) = send(&app, login_request(payload.to_string())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], true);
    assert_eq!(json["message"], "Authentication failed.");
}

#[tokio::test]
async fn test_login_unreadable_body_stops() {
    let (app, _) = test_app();
    let (status, json) = send(&app, login_request("{not json".to_string())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], true);
    // no validation or credential data after the body failure
    assert!(json.get("data").is_none());
}

#[tokio::test]
async fn test_login_empty_fields() {
    let (app, _) = test_app();
    let (status, json) = send(&app, login_request(json!({ "email": "" }).to_string())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["data"]["errors"]["email"], "The email field is required.");
    assert_eq!(json["data"]["errors"]["password"], "The password field is required.");
}

#[tokio::test]
async fn test_me_with_valid_token() {
    let (app, _) = test_app();
    let token = login(&app, "a@x.com", "password").await;
    let (status, json) = send(&app, me_request(Some(&format!("Bearer {}", token)))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["user"], json!({ "id": 42, "email": "a@x.com" }));
}

#[tokio::test]
async fn test_missing_authorization_header() {
    let (app, _) = test_app();
    let response = app.clone().oneshot(me_request(None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["message"], "Authorization header missing.");
}

#[tokio::test]
async fn test_wrong_scheme_is_malformed_header() {
    let (app, _) = test_app();
    let (status, json) = send(&app, me_request(Some("Token abc"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["message"], "Invalid authorization format. Expected 'Bearer <token>'.");
}

#[tokio::test]
async fn test_invalid_token() {
    let (app, _) = test_app();
    let (status, json) = send(&app, me_request(Some("Bearer invalidtoken"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["message"], "Invalid or expired token.");
}

#[tokio::test]
async fn test_expired_token() {
    let (app, clock) = test_app();
    let token = login(&app, "a@x.com", "password").await;
    clock.advance(2 * 60 * 60 + 1);
    let (status, json) = send(&app, me_request(Some(&format!("Bearer {}", token)))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["message"], "Invalid or expired token.");
}

#[tokio::test]
async fn test_logout_revokes_token() {
    let (app, _) = test_app();
    let token = login(&app, "a@x.com", "password").await;

    let (status, json) = send(&app, logout_request(&token, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["error"], false);

    let (status, _) = send(&app, me_request(Some(&format!("Bearer {}", token)))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // the revoked token cannot log out again
    let (status, _) = send(&app, logout_request(&token, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_requires_authentication() {
    let (app, _) = test_app();
    let request = Request::builder()
        .method("POST")
        .uri("/users/logout")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_with_body_token_of_same_user() {
    let (app, clock) = test_app();
    let first = login(&app, "a@x.com", "password").await;
    clock.advance(1);
    let second = login(&app, "a@x.com", "password").await;
    assert_ne!(first, second);

    let (status, _) = send(&app, logout_request(&second, Some(json!({ "token": first })))).await;
    assert_eq!(status, StatusCode::OK);

    for token in [&first, &second] {
        let (status, _) = send(&app, me_request(Some(&format!("Bearer {}", token)))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn test_logout_cannot_revoke_other_users_token() {
    let (app, _) = test_app();
    let mine = login(&app, "a@x.com", "password").await;
    let theirs = login(&app, "b@x.com", "hunter2").await;

    let (status, _) = send(&app, logout_request(&mine, Some(json!({ "token": theirs })))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, me_request(Some(&format!("Bearer {}", theirs)))).await;
    assert_eq!(status, StatusCode::OK);
    // rejected logout leaves the caller signed in
    let (status, _) = send(&app, me_request(Some(&format!("Bearer {}", mine)))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_logout_with_invalid_json_body() {
    let (app, _) = test_app();
    let token = login(&app, "a@x.com", "password").await;
    let request = Request::builder()
        .method("POST")
        .uri("/users/logout")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::from("{oops"))
        .unwrap();
    let (status, json) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "Invalid JSON.");

    // nothing was revoked
    let (status, _) = send(&app, me_request(Some(&format!("Bearer {}", token)))).await;
    assert_eq!(status, StatusCode::OK);
}
