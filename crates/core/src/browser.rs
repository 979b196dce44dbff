//! Client-context session resolution
//!
//! [`BrowserSessionResolver::fetch_session`] turns the stored Token Set into
//! a [`Session`], refreshing and re-validating against the identity provider
//! as needed. It is fail-closed: every ambiguous outcome resolves to `None`.
//!
//! At most one refresh grant is in flight per refresh token. Concurrent
//! callers that find the same expired set await one shared future.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use ssokit_domain::{Result, Session, SsoError, TokenSet, TokenTypeHint};
use tracing::{debug, info, warn};

use crate::normalize::normalize_user_info;
use crate::ports::{Clock, IdentityProvider, SessionResolver, SessionStorage, SystemClock};
use crate::token_store::TokenStore;
use crate::urls::build_logout_url;

type SharedRefresh = Shared<BoxFuture<'static, Result<TokenSet>>>;

struct InFlightRefresh {
    id: u64,
    refresh_token: String,
    future: SharedRefresh,
}

/// Resolves the current session from tab-scoped tokens
pub struct BrowserSessionResolver<P, S>
where
    P: IdentityProvider + 'static,
    S: SessionStorage + 'static,
{
    provider: Arc<P>,
    tokens: Arc<TokenStore<S>>,
    clock: Arc<dyn Clock>,
    buffer_ms: i64,
    in_flight: Mutex<Option<InFlightRefresh>>,
    next_refresh_id: AtomicU64,
}

impl<P, S> BrowserSessionResolver<P, S>
where
    P: IdentityProvider + 'static,
    S: SessionStorage + 'static,
{
    /// Create a resolver using the provider's configured refresh buffer.
    #[must_use]
    pub fn new(provider: Arc<P>, tokens: Arc<TokenStore<S>>) -> Self {
        let buffer_ms = provider.config().refresh_buffer_ms;
        Self {
            provider,
            tokens,
            clock: Arc::new(SystemClock),
            buffer_ms,
            in_flight: Mutex::new(None),
            next_refresh_id: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn token_store(&self) -> &Arc<TokenStore<S>> {
        &self.tokens
    }

    /// Resolve the current session.
    ///
    /// 1. No stored tokens: `None`.
    /// 2. Expired (within the buffer): refresh. No refresh token or a failed
    ///    refresh clears the tokens and yields `None`.
    /// 3. UserInfo with the (possibly refreshed) access token.
    /// 4. 401 clears the tokens and yields `None`.
    /// 5. Any other failure yields `None` and keeps the tokens.
    /// 6. Success is normalized into a [`Session`].
    pub async fn fetch_session(&self) -> Option<Session> {
        let Some(mut tokens) = self.tokens.get_stored_tokens() else {
            debug!("no stored tokens");
            return None;
        };

        if tokens.is_expired_at(self.clock.now_ms(), self.buffer_ms) {
            match self.refresh(&tokens).await {
                Ok(next) => tokens = next,
                Err(e) => {
                    debug!(label = e.label(), "session lost during refresh");
                    return None;
                }
            }
        }

        match self.provider.fetch_user_info(&tokens.access_token).await {
            Ok(claims) => Some(normalize_user_info(&claims, tokens.expires_at)),
            Err(SsoError::UserInfo { status: 401, .. }) => {
                info!("access token rejected by identity provider; clearing session");
                self.tokens.clear_tokens();
                None
            }
            Err(e) => {
                debug!(error = %e, label = e.label(), "userinfo unavailable; keeping tokens");
                None
            }
        }
    }

    /// A currently valid access token, refreshing first if needed.
    ///
    /// # Errors
    /// [`SsoError::MissingRefreshToken`] when signed out, or the refresh
    /// error (after which the tokens are gone).
    pub async fn access_token(&self) -> Result<String> {
        let tokens = self.tokens.get_stored_tokens().ok_or(SsoError::MissingRefreshToken)?;
        if !tokens.is_expired_at(self.clock.now_ms(), self.buffer_ms) {
            return Ok(tokens.access_token);
        }
        self.refresh(&tokens).await.map(|next| next.access_token)
    }

    /// Refresh `current`, joining an in-flight refresh for the same token.
    ///
    /// Any failure clears the stored tokens.
    async fn refresh(&self, current: &TokenSet) -> Result<TokenSet> {
        let (id, future) = {
            let mut slot = self.in_flight.lock();

            // A refresh that finished before we got here may already have
            // rotated this token. Refresh from the newest set either way.
            let base = match self.tokens.get_stored_tokens() {
                None => return Err(SsoError::MissingRefreshToken),
                Some(latest)
                    if latest.refresh_token.is_some() && latest.refresh_token != current.refresh_token =>
                {
                    if !latest.is_expired_at(self.clock.now_ms(), self.buffer_ms) {
                        return Ok(latest);
                    }
                    latest
                }
                Some(_) => current.clone(),
            };

            let Some(refresh_token) = base.refresh_token.clone() else {
                info!("access token expired without a refresh token; clearing session");
                self.tokens.clear_tokens();
                return Err(SsoError::MissingRefreshToken);
            };

            match slot.as_ref() {
                Some(flight) if flight.refresh_token == refresh_token => {
                    debug!("joining in-flight token refresh");
                    (flight.id, flight.future.clone())
                }
                _ => {
                    let id = self.next_refresh_id.fetch_add(1, Ordering::Relaxed);
                    let future = run_refresh(
                        Arc::clone(&self.provider),
                        Arc::clone(&self.tokens),
                        Arc::clone(&self.clock),
                        base,
                        refresh_token.clone(),
                    )
                    .boxed()
                    .shared();
                    *slot = Some(InFlightRefresh { id, refresh_token, future: future.clone() });
                    (id, future)
                }
            }
        };

        let result = future.await;

        let mut slot = self.in_flight.lock();
        if slot.as_ref().is_some_and(|flight| flight.id == id) {
            *slot = None;
        }
        result
    }

    /// Clear the session and return the end-session URL to navigate to.
    ///
    /// Revocation is best-effort and never blocks clearing.
    pub async fn sign_out(&self) -> String {
        let tokens = self.tokens.get_stored_tokens();
        self.tokens.clear_tokens();

        let config = self.provider.config();
        let id_token = tokens.as_ref().and_then(|t| t.id_token.clone());

        if let Some(tokens) = tokens {
            let (token, hint) = match tokens.refresh_token {
                Some(refresh) => (refresh, TokenTypeHint::RefreshToken),
                None => (tokens.access_token, TokenTypeHint::AccessToken),
            };
            if let Err(e) = self.provider.revoke_token(&token, hint).await {
                warn!(error = %e, "token revocation failed during sign-out");
            }
        }

        info!("signed out");
        build_logout_url(
            &config.identity_base_url,
            id_token.as_deref(),
            config.post_logout_redirect_uri.as_deref(),
        )
    }
}

async fn run_refresh<P, S>(
    provider: Arc<P>,
    tokens: Arc<TokenStore<S>>,
    clock: Arc<dyn Clock>,
    current: TokenSet,
    refresh_token: String,
) -> Result<TokenSet>
where
    P: IdentityProvider + 'static,
    S: SessionStorage + 'static,
{
    match provider.refresh_token(&refresh_token).await {
        Ok(response) => {
            let next = TokenSet::rotate(&current, response, clock.now_ms());
            tokens.store_tokens(&next);
            info!("access token refreshed");
            Ok(next)
        }
        Err(e) => {
            warn!(error = %e, label = e.label(), "token refresh failed; clearing session");
            tokens.clear_tokens();
            Err(e)
        }
    }
}

#[async_trait::async_trait]
impl<P, S> SessionResolver for BrowserSessionResolver<P, S>
where
    P: IdentityProvider + 'static,
    S: SessionStorage + 'static,
{
    async fn resolve_session(&self) -> Option<Session> {
        self.fetch_session().await
    }
}
