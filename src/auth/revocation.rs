//! In-memory token revocation store used by logout.
//!
//! Entries are keyed by the exact token string and remember the token's `exp`
//! so they can be dropped once the codec would reject the token anyway.
//! The store lives for the lifetime of the process; a restart clears it.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::auth::clock::Clock;
use crate::auth::codec::peek_expiry;

#[derive(Clone, Default)]
pub struct RevocationStore {
    // token -> exp (None when the payload could not be read)
    inner: Arc<RwLock<HashMap<String, Option<i64>>>>,
}

impl RevocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `token` as revoked. Revoking the same token twice is a no-op.
    pub fn revoke(&self, token: &str) {
        let expires_at = peek_expiry(token);
        let mut revoked = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        revoked.entry(token.to_owned()).or_insert(expires_at);
    }

    pub fn is_revoked(&self, token: &str) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(token)
    }

    /// Drops entries whose token expired at or before `now`. Entries without a
    /// readable expiry are kept. Returns the number of entries removed.
    pub fn purge_expired(&self, now: i64) -> usize {
        let mut revoked = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let before = revoked.len();
        revoked.retain(|_, expires_at| expires_at.is_none_or(|exp| exp > now));
        before - revoked.len()
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Spawns a background task that purges expired entries every `every`.
pub fn spawn_purge_task(
    store: RevocationStore,
    clock: Arc<dyn Clock>,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // the first tick fires immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = store.purge_expired(clock.now_unix());
            if removed > 0 {
                tracing::debug!("Purged {} expired revocation entries ({} left)", removed, store.len());
            }
        }
    })
}
