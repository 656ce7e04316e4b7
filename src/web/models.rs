//! Contains the data models for API requests and responses.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::auth::Principal;

/// Envelope used by every JSON response.
#[derive(Serialize, Debug)]
pub struct JsonResponse {
    pub error: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonResponse {
    pub fn ok(message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            error: false,
            message: message.into(),
            data,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: true,
            message: message.into(),
            data: None,
        }
    }

    pub fn error_with_data(message: impl Into<String>, data: Value) -> Self {
        Self {
            data: Some(data),
            ..Self::error(message)
        }
    }
}

/// Represents a login request. Missing fields deserialize as empty strings and
/// are reported by validation.
#[derive(Deserialize, Debug, Default)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Optional logout body naming an extra token to revoke.
#[derive(Deserialize, Debug, Default)]
pub struct LogoutRequest {
    #[serde(default)]
    pub token: Option<String>,
}

/// Public view of an authenticated user.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
}

impl From<&Principal> for UserResponse {
    fn from(principal: &Principal) -> Self {
        Self {
            id: principal.user_id,
            email: principal.email.clone(),
        }
    }
}
