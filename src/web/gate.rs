//! Bearer-token gate for protected routes.
//!
//! [`require_auth`] runs once per request: it parses `Authorization: Bearer <token>`,
//! verifies the token and stores the resulting [`AuthSession`] in the request
//! extensions. Handlers read it back with the [`CurrentUser`] extractor, which
//! never verifies the token a second time.

use axum::{
    Json,
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, HeaderValue, StatusCode, header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::auth::{Principal, TokenCodec, TokenError};
use crate::web::api::AppState;
use crate::web::models::JsonResponse;

/// Why a request was not authenticated. Always rendered as 401.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthRejection {
    #[error("authorization header missing")]
    MissingHeader,
    #[error("authorization header is not 'Bearer <token>'")]
    MalformedHeader,
    #[error("{0}")]
    Token(#[from] TokenError),
}

impl AuthRejection {
    /// Message shown to the client. Token failures share one message so the
    /// response does not reveal which check failed.
    pub fn client_message(&self) -> &'static str {
        match self {
            Self::MissingHeader => "Authorization header missing.",
            Self::MalformedHeader => "Invalid authorization format. Expected 'Bearer <token>'.",
            Self::Token(_) => "Invalid or expired token.",
        }
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let challenge = match self {
            Self::Token(_) => r#"Bearer error="invalid_token""#,
            _ => "Bearer",
        };
        (
            StatusCode::UNAUTHORIZED,
            [(header::WWW_AUTHENTICATE, HeaderValue::from_static(challenge))],
            Json(JsonResponse::error(self.client_message())),
        )
            .into_response()
    }
}

/// Identity attached to an authenticated request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub principal: Principal,
    /// The bearer token exactly as presented, needed by logout.
    pub token: String,
}

/// Extracts the token from an `Authorization` header value. An empty header is
/// treated as missing.
pub fn bearer_token(value: Option<&str>) -> Result<&str, AuthRejection> {
    let value = value
        .filter(|v| !v.is_empty())
        .ok_or(AuthRejection::MissingHeader)?;
    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) => Ok(token),
        _ => Err(AuthRejection::MalformedHeader),
    }
}

/// Runs the full header + token check against `headers`.
pub fn authenticate(codec: &TokenCodec, headers: &HeaderMap) -> Result<AuthSession, AuthRejection> {
    let value = headers
        .get(header::AUTHORIZATION)
        .map(|v| v.to_str().map_err(|_| AuthRejection::MalformedHeader))
        .transpose()?;
    let token = bearer_token(value)?;
    let principal = codec.verify(token)?;
    Ok(AuthSession {
        principal,
        token: token.to_owned(),
    })
}

/// Middleware guarding protected routes.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthRejection> {
    match authenticate(&state.codec, req.headers()) {
        Ok(session) => {
            tracing::debug!("Authenticated user {} for {}", session.principal.user_id, req.uri().path());
            req.extensions_mut().insert(session);
            Ok(next.run(req).await)
        }
        Err(rejection) => {
            tracing::warn!("Rejected {} {}: {}", req.method(), req.uri().path(), rejection);
            Err(rejection)
        }
    }
}

/// The session attached by [`require_auth`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub AuthSession);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // only present behind require_auth
        parts
            .extensions
            .get::<AuthSession>()
            .cloned()
            .map(CurrentUser)
            .ok_or(AuthRejection::MissingHeader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{DEFAULT_TOKEN_TTL, ManualClock, RevocationStore};
    use std::sync::Arc;

    fn codec() -> TokenCodec {
        TokenCodec::new(b"gate-test-secret", RevocationStore::new())
            .with_clock(Arc::new(ManualClock::new(1_700_000_000)))
    }

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_shapes() {
        assert_eq!(bearer_token(Some("Bearer abc")), Ok("abc"));
        assert_eq!(bearer_token(None), Err(AuthRejection::MissingHeader));
        assert_eq!(bearer_token(Some("")), Err(AuthRejection::MissingHeader));
        for bad in ["Token abc", "Bearer", "bearer abc", "Bearer a b", "Bearer  abc", "abc"] {
            assert_eq!(bearer_token(Some(bad)), Err(AuthRejection::MalformedHeader), "{:?}", bad);
        }
    }

    #[test]
    fn test_authenticate_valid_token() {
        let codec = codec();
        let principal = Principal::new(42, "a@x.com");
        let token = codec.issue(&principal, DEFAULT_TOKEN_TTL).unwrap();
        let session = authenticate(&codec, &headers(&format!("Bearer {}", token))).unwrap();
        assert_eq!(session.principal, principal);
        assert_eq!(session.token, token);
    }

    #[test]
    fn test_wrong_scheme_never_reaches_codec() {
        let codec = codec();
        let token = codec.issue(&Principal::new(42, "a@x.com"), DEFAULT_TOKEN_TTL).unwrap();
        // a valid token under the wrong scheme is still a header failure
        assert_eq!(
            authenticate(&codec, &headers(&format!("Token {}", token))),
            Err(AuthRejection::MalformedHeader)
        );
        assert_eq!(authenticate(&codec, &headers("Token abc")), Err(AuthRejection::MalformedHeader));
    }

    #[test]
    fn test_missing_header() {
        assert_eq!(authenticate(&codec(), &HeaderMap::new()), Err(AuthRejection::MissingHeader));
    }

    #[test]
    fn test_codec_failures_are_wrapped() {
        let codec = codec();
        let token = codec.issue(&Principal::new(42, "a@x.com"), DEFAULT_TOKEN_TTL).unwrap();
        codec.revoke(&token);
        assert_eq!(
            authenticate(&codec, &headers(&format!("Bearer {}", token))),
            Err(AuthRejection::Token(TokenError::Revoked))
        );
        assert_eq!(
            authenticate(&codec, &headers("Bearer abc")),
            Err(AuthRejection::Token(TokenError::Malformed))
        );
    }

    #[test]
    fn test_token_failures_share_client_message() {
        let a = AuthRejection::Token(TokenError::BadSignature).client_message();
        let b = AuthRejection::Token(TokenError::Revoked).client_message();
        assert_eq!(a, b);
        assert_ne!(a, AuthRejection::MissingHeader.client_message());
    }

    #[test]
    fn test_rejection_response() {
        let response = AuthRejection::MalformedHeader.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");
    }
}
