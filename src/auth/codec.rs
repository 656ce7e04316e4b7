//! Session token issuance and verification.
//!
//! Tokens are HS256 JWTs: `base64url(header).base64url(payload).base64url(tag)`.
//! The payload holds `email`, `exp` and `userID`. There is no `iat` claim, so a
//! given principal and expiry always produce the same token.
//!
//! Verification runs its checks in a fixed order (structure, algorithm,
//! signature, expiry, revocation) and stops at the first failure, so a token
//! that is both forged and revoked always reports the forgery.

use std::sync::Arc;
use std::time::Duration;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::auth::clock::{Clock, SystemClock};
use crate::auth::principal::Principal;
use crate::auth::revocation::RevocationStore;
use crate::config::{AuthConfig, ConfigError};

/// The only accepted value of the header `alg` field.
pub const SIGNING_ALGORITHM: &str = "HS256";

/// Default session lifetime: 2 hours.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(2 * 60 * 60);

/// Why a token was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("unexpected signing algorithm")]
    UnexpectedAlgorithm,
    #[error("bad signature")]
    BadSignature,
    #[error("missing or invalid expiry")]
    MissingExpiry,
    #[error("token has expired")]
    Expired,
    #[error("token is revoked")]
    Revoked,
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::InvalidSignature => Self::BadSignature,
            ErrorKind::InvalidAlgorithm
            | ErrorKind::InvalidAlgorithmName
            | ErrorKind::MissingAlgorithm => Self::UnexpectedAlgorithm,
            ErrorKind::ExpiredSignature => Self::Expired,
            _ => Self::Malformed,
        }
    }
}

#[derive(Debug, Error)]
pub enum IssueError {
    #[error("user id must be positive, got {0}")]
    InvalidPrincipal(i64),
    #[error("failed to sign token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

// Field order matches the sorted key order other JWT libraries emit.
#[derive(Serialize)]
struct Claims<'a> {
    email: &'a str,
    exp: i64,
    #[serde(rename = "userID")]
    user_id: i64,
}

/// Issues and verifies session tokens with a single symmetric secret.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    revocations: RevocationStore,
}

impl TokenCodec {
    /// Builds a codec around `secret`. The secret is expected to be validated by
    /// the caller; see [`TokenCodec::from_config`].
    pub fn new(secret: &[u8], revocations: RevocationStore) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // expiry is checked against the injected clock instead
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            ttl: DEFAULT_TOKEN_TTL,
            clock: Arc::new(SystemClock),
            revocations,
        }
    }

    pub fn from_config(config: &AuthConfig, revocations: RevocationStore) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(config.secret.as_bytes(), revocations).with_ttl(config.token_ttl()))
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Session lifetime used by [`TokenCodec::issue_session`].
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    pub fn revocations(&self) -> &RevocationStore {
        &self.revocations
    }

    /// Issues a token for `principal` expiring `ttl` from now.
    pub fn issue(&self, principal: &Principal, ttl: Duration) -> Result<String, IssueError> {
        if !principal.is_valid() {
            return Err(IssueError::InvalidPrincipal(principal.user_id));
        }
        let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        let claims = Claims {
            email: &principal.email,
            exp: self.clock.now_unix().saturating_add(ttl_secs),
            user_id: principal.user_id,
        };
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?)
    }

    /// Issues a token with the configured session lifetime.
    pub fn issue_session(&self, principal: &Principal) -> Result<String, IssueError> {
        self.issue(principal, self.ttl)
    }

    /// Verifies `token` and returns the principal it was issued for.
    pub fn verify(&self, token: &str) -> Result<Principal, TokenError> {
        let parts = TokenParts::parse(token)?;

        if parts.algorithm()? != SIGNING_ALGORITHM {
            return Err(TokenError::UnexpectedAlgorithm);
        }

        let claims = decode::<Value>(token, &self.decoding_key, &self.validation)?.claims;

        let expires_at = expiry_of(&claims).ok_or(TokenError::MissingExpiry)?;
        if expires_at <= self.clock.now_unix() {
            return Err(TokenError::Expired);
        }

        if self.revocations.is_revoked(token) {
            return Err(TokenError::Revoked);
        }

        principal_of(&claims).ok_or(TokenError::Malformed)
    }

    /// Marks `token` as revoked for the rest of its lifetime.
    pub fn revoke(&self, token: &str) {
        self.revocations.revoke(token);
    }
}

/// Reads the `exp` claim without checking the signature. Used to schedule
/// cleanup of revoked tokens, never to make an access decision.
pub fn peek_expiry(token: &str) -> Option<i64> {
    let parts = TokenParts::parse(token).ok()?;
    expiry_of(&parts.payload)
}

struct TokenParts {
    header: Value,
    payload: Value,
}

impl TokenParts {
    fn parse(token: &str) -> Result<Self, TokenError> {
        let mut segments = token.split('.');
        let (Some(header), Some(payload), Some(_tag), None) =
            (segments.next(), segments.next(), segments.next(), segments.next())
        else {
            return Err(TokenError::Malformed);
        };
        if header.is_empty() || payload.is_empty() {
            return Err(TokenError::Malformed);
        }
        Ok(Self {
            header: decode_segment(header)?,
            payload: decode_segment(payload)?,
        })
    }

    fn algorithm(&self) -> Result<&str, TokenError> {
        self.header
            .get("alg")
            .and_then(Value::as_str)
            .ok_or(TokenError::Malformed)
    }
}

fn decode_segment(segment: &str) -> Result<Value, TokenError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| TokenError::Malformed)?;
    match serde_json::from_slice::<Value>(&bytes) {
        Ok(value @ Value::Object(_)) => Ok(value),
        _ => Err(TokenError::Malformed),
    }
}

fn expiry_of(claims: &Value) -> Option<i64> {
    let exp = claims.get("exp")?;
    exp.as_i64().or_else(|| {
        exp.as_f64()
            .filter(|secs| secs.is_finite())
            .map(|secs| secs as i64)
    })
}

fn principal_of(claims: &Value) -> Option<Principal> {
    let user_id = claims.get("userID")?.as_i64().filter(|id| *id > 0)?;
    let email = claims.get("email")?.as_str()?;
    Some(Principal::new(user_id, email))
}
