//! The authenticated identity carried inside a session token.

use serde::{Deserialize, Serialize};

/// User identity recovered from a verified token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: i64,
    pub email: String,
}

impl Principal {
    pub fn new(user_id: i64, email: impl Into<String>) -> Self {
        Self {
            user_id,
            email: email.into(),
        }
    }

    /// Only positive, non-zero ids can be embedded in a token.
    pub fn is_valid(&self) -> bool {
        self.user_id > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_principal_validity() {
        assert!(Principal::new(42, "a@x.com").is_valid());
        assert!(!Principal::new(0, "a@x.com").is_valid());
        assert!(!Principal::new(-7, "a@x.com").is_valid());
    }
}
