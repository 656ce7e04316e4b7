//! Credential check consumed by the login flow.
//!
//! Password policy lives behind this trait; the token layer only needs the
//! resulting [`Principal`].

use async_trait::async_trait;
use std::collections::HashMap;

use crate::auth::principal::Principal;
use crate::config::UserEntry;

#[async_trait]
pub trait CredentialVerifier: Send + Sync + 'static {
    /// Returns the principal for valid credentials, `None` otherwise.
    async fn verify(&self, email: &str, password: &str) -> Option<Principal>;
}

/// In-memory account list, seeded from configuration.
pub struct InMemoryCredentials {
    // email -> (id, password)
    users: HashMap<String, (i64, String)>,
}

impl InMemoryCredentials {
    pub fn new(users: impl IntoIterator<Item = UserEntry>) -> Self {
        let users = users
            .into_iter()
            .filter(|u| {
                if u.id <= 0 {
                    tracing::warn!("Skipping configured user '{}' with non-positive id {}", u.email, u.id);
                }
                u.id > 0
            })
            .map(|u| (u.email, (u.id, u.password)))
            .collect();
        Self { users }
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl CredentialVerifier for InMemoryCredentials {
    async fn verify(&self, email: &str, password: &str) -> Option<Principal> {
        let (id, expected) = self.users.get(email)?;
        (expected == password).then(|| Principal::new(*id, email))
    }
}
