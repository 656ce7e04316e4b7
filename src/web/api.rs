//! Defines the Axum routes for login, logout and the current user.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;

use crate::auth::{CredentialVerifier, TokenCodec, TokenError};
use crate::web::gate::{CurrentUser, require_auth};
use crate::web::models::{JsonResponse, LoginRequest, LogoutRequest, UserResponse};

/// Helper to create a JSON error response with a message and status code
fn json_error(message: &str, status: StatusCode) -> Response {
    (status, Json(JsonResponse::error(message))).into_response()
}

pub struct AppStateInner {
    pub codec: TokenCodec,
    pub credentials: Box<dyn CredentialVerifier>,
}
pub type AppState = Arc<AppStateInner>;

/// Creates the Axum router. Everything except login sits behind the bearer gate.
pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/users/logout", post(logout_user))
        .route("/users/me", get(current_user))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/users/login", post(login_user))
        .merge(protected)
        .with_state(state)
}

fn check_empty_field(errors: &mut BTreeMap<&'static str, String>, field: &'static str, value: &str) {
    if value.trim().is_empty() {
        errors.insert(field, format!("The {} field is required.", field.replace('_', " ")));
    }
}

/// POST /users/login
async fn login_user(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Response {
    let creds = match payload {
        Ok(Json(creds)) => creds,
        Err(rejection) => {
            tracing::debug!("Unreadable login body: {}", rejection);
            return json_error(
                "Oops! Something went wrong. Please try again later.",
                StatusCode::BAD_REQUEST,
            );
        }
    };

    let mut errors = BTreeMap::new();
    check_empty_field(&mut errors, "email", &creds.email);
    check_empty_field(&mut errors, "password", &creds.password);
    if !errors.is_empty() {
        let body = JsonResponse::error_with_data(
            "There was an issue with the validation process.",
            json!({ "errors": errors }),
        );
        return (StatusCode::BAD_REQUEST, Json(body)).into_response();
    }

    let Some(principal) = state.credentials.verify(&creds.email, &creds.password).await else {
        tracing::info!("Failed login attempt for {}", creds.email);
        return json_error("Authentication failed.", StatusCode::BAD_REQUEST);
    };

    match state.codec.issue_session(&principal) {
        Ok(token) => {
            tracing::info!("User {} logged in", principal.user_id);
            let data = json!({ "user": UserResponse::from(&principal), "token": token });
            (
                StatusCode::OK,
                Json(JsonResponse::ok("Welcome! It's great to see you again!", Some(data))),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!("Failed to issue token for user {}: {}", principal.user_id, e);
            json_error("Internal error", StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// POST /users/logout -- revoke the presented token, plus an optional `token`
/// from the body if it belongs to the same user.
async fn logout_user(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    body: Bytes,
) -> Response {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        LogoutRequest::default()
    } else {
        match serde_json::from_slice::<LogoutRequest>(&body) {
            Ok(request) => request,
            Err(_) => return json_error("Invalid JSON.", StatusCode::BAD_REQUEST),
        }
    };

    if let Some(extra) = request.token.filter(|t| *t != session.token) {
        match state.codec.verify(&extra) {
            Ok(owner) if owner.user_id == session.principal.user_id => state.codec.revoke(&extra),
            Ok(_) => {
                tracing::warn!(
                    "User {} tried to revoke a token of another user",
                    session.principal.user_id
                );
                return json_error("Token does not belong to the current user.", StatusCode::FORBIDDEN);
            }
            // already unusable
            Err(TokenError::Revoked | TokenError::Expired) => {}
            Err(e) => {
                tracing::debug!("Ignoring invalid logout token: {}", e);
                return json_error("Invalid token.", StatusCode::BAD_REQUEST);
            }
        }
    }

    state.codec.revoke(&session.token);
    tracing::info!("User {} logged out", session.principal.user_id);
    (
        StatusCode::OK,
        Json(JsonResponse::ok("You've been logged out successfully!", None)),
    )
        .into_response()
}

/// GET /users/me
async fn current_user(CurrentUser(session): CurrentUser) -> Json<JsonResponse> {
    let user = UserResponse::from(&session.principal);
    Json(JsonResponse::ok("OK", Some(json!({ "user": user }))))
}
