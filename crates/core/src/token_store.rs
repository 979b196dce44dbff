//! Client-context token store
//!
//! Holds the Token Set for one execution context (one browser tab). The
//! in-memory copy is authoritative; a tab-scoped [`SessionStorage`] mirror
//! lets the set survive reloads without leaking across tabs.
//!
//! All storage access is best-effort. A failing backend (private browsing,
//! quota) or an undecodable stored value downgrades the store to
//! memory-only instead of propagating an error.

use parking_lot::RwLock;
use ssokit_domain::constants::TOKEN_STORAGE_KEY;
use ssokit_domain::TokenSet;
use tracing::{debug, warn};

use crate::ports::{Clock, SessionStorage, SystemClock};

/// Token store with a storage mirror
pub struct TokenStore<S: SessionStorage> {
    storage: S,
    key: String,
    current: RwLock<Option<TokenSet>>,
}

impl<S: SessionStorage> TokenStore<S> {
    /// Create a store mirrored under the default `ssokit.tokens` key.
    #[must_use]
    pub fn new(storage: S) -> Self {
        Self::with_key(storage, TOKEN_STORAGE_KEY)
    }

    #[must_use]
    pub fn with_key(storage: S, key: impl Into<String>) -> Self {
        Self { storage, key: key.into(), current: RwLock::new(None) }
    }

    /// Overwrite both the in-memory and the stored copy.
    pub fn store_tokens(&self, tokens: &TokenSet) {
        *self.current.write() = Some(tokens.clone());

        match serde_json::to_string(tokens) {
            Ok(json) => {
                if let Err(e) = self.storage.set_item(&self.key, &json) {
                    warn!(error = %e, "token storage write failed; keeping tokens in memory only");
                }
            }
            Err(e) => warn!(error = %e, "failed to serialize tokens for storage"),
        }
    }

    /// In-memory tokens, else lazily hydrated from storage.
    #[must_use]
    pub fn get_stored_tokens(&self) -> Option<TokenSet> {
        if let Some(tokens) = self.current.read().clone() {
            return Some(tokens);
        }

        let raw = match self.storage.get_item(&self.key) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(error = %e, "token storage read failed");
                return None;
            }
        };

        match serde_json::from_str::<TokenSet>(&raw) {
            Ok(tokens) => {
                debug!("hydrated tokens from session storage");
                *self.current.write() = Some(tokens.clone());
                Some(tokens)
            }
            Err(e) => {
                warn!(error = %e, "discarding undecodable stored tokens");
                None
            }
        }
    }

    /// Remove both copies.
    pub fn clear_tokens(&self) {
        *self.current.write() = None;
        if let Err(e) = self.storage.remove_item(&self.key) {
            warn!(error = %e, "token storage delete failed");
        }
    }

    /// Storage key the mirror is written under.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

/// `now >= expires_at - buffer_ms` against the system clock.
#[must_use]
pub fn is_token_expired(tokens: &TokenSet, buffer_ms: i64) -> bool {
    is_token_expired_at(tokens, SystemClock.now_ms(), buffer_ms)
}

/// Same as [`is_token_expired`] at a fixed instant.
#[must_use]
pub fn is_token_expired_at(tokens: &TokenSet, now_ms: i64, buffer_ms: i64) -> bool {
    tokens.is_expired_at(now_ms, buffer_ms)
}
