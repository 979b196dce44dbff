//! High-level client-context SSO service
//!
//! Combines the identity provider, the tab-scoped token store, the login
//! flow and the session resolver into a single explicitly constructed
//! object. Nothing here is global: two clients over two storages are fully
//! isolated.

use std::sync::Arc;

use ssokit_domain::{Result, Session, SsoConfig, TokenSet};
use tracing::info;

use crate::browser::BrowserSessionResolver;
use crate::context::{ProviderConfig, ProviderOptions};
use crate::flow::{CallbackParams, LoginFlow};
use crate::ports::{Clock, IdentityProvider, SessionResolver, SessionStorage, SystemClock};
use crate::token_store::TokenStore;

/// SSO client for one execution context
///
/// # Examples
/// ```rust,ignore
/// use ssokit_core::testing::{MockIdentityProvider, MockStorage};
/// use ssokit_core::SsoClient;
///
/// let client = SsoClient::new(MockIdentityProvider::new(), MockStorage::new()).unwrap();
/// let url = client.begin_login(Some("/dashboard"));
/// assert!(url.contains("code_challenge_method=S256"));
/// ```
pub struct SsoClient<P, S>
where
    P: IdentityProvider + 'static,
    S: SessionStorage + 'static,
{
    provider: Arc<P>,
    tokens: Arc<TokenStore<Arc<S>>>,
    flow: LoginFlow<Arc<S>>,
    resolver: BrowserSessionResolver<P, Arc<S>>,
    clock: Arc<dyn Clock>,
}

impl<P, S> SsoClient<P, S>
where
    P: IdentityProvider + 'static,
    S: SessionStorage + 'static,
{
    /// Create a client over `storage`.
    ///
    /// # Errors
    /// [`ssokit_domain::SsoError::Configuration`] if the provider's
    /// configuration is invalid.
    pub fn new(provider: P, storage: S) -> Result<Self> {
        Self::with_clock(provider, storage, Arc::new(SystemClock))
    }

    /// Create a client with an explicit clock.
    ///
    /// # Errors
    /// Same as [`SsoClient::new`].
    pub fn with_clock(provider: P, storage: S, clock: Arc<dyn Clock>) -> Result<Self> {
        provider.config().validate()?;

        let provider = Arc::new(provider);
        let storage = Arc::new(storage);
        let tokens = Arc::new(TokenStore::new(Arc::clone(&storage)));
        let resolver = BrowserSessionResolver::new(Arc::clone(&provider), Arc::clone(&tokens))
            .with_clock(Arc::clone(&clock));

        Ok(Self { provider, tokens, flow: LoginFlow::new(storage), resolver, clock })
    }

    #[must_use]
    pub fn config(&self) -> &SsoConfig {
        self.provider.config()
    }

    /// Start a login and return the authorization URL to navigate to.
    #[must_use]
    pub fn begin_login(&self, return_to: Option<&str>) -> String {
        self.flow.begin(self.provider.config(), return_to, self.clock.now_ms())
    }

    /// Start a login with a provider's merged configuration; its scopes
    /// replace the configured ones in the authorization request.
    #[must_use]
    pub fn begin_login_with(&self, provider: &ProviderConfig, return_to: Option<&str>) -> String {
        let config = self.provider.config().clone().with_overrides(provider.overrides());
        self.flow.begin(&config, return_to, self.clock.now_ms())
    }

    /// Provider configuration merged over this client's settings.
    #[must_use]
    pub fn provider_config(&self, options: ProviderOptions) -> ProviderConfig {
        ProviderConfig::from_config(self.provider.config(), options)
    }

    /// Finish a login from the callback's query parameters.
    ///
    /// Stores the new Token Set and returns the sanitized `return_to` path
    /// recorded when the login began.
    ///
    /// # Errors
    /// State mismatch, missing code, provider error, missing attempt or a
    /// failed exchange. No tokens are stored on error.
    pub async fn complete_login(&self, params: &CallbackParams) -> Result<Option<String>> {
        let outcome = self.flow.complete(self.provider.as_ref(), params, self.clock.now_ms()).await?;
        self.tokens.store_tokens(&outcome.tokens);
        Ok(outcome.return_to)
    }

    /// Finish a login from the full redirect URL.
    ///
    /// # Errors
    /// Same as [`SsoClient::complete_login`], plus an unparsable URL.
    pub async fn handle_redirect(&self, url: &str) -> Result<Option<String>> {
        let params = CallbackParams::from_url(url)?;
        self.complete_login(&params).await
    }

    /// Resolve the current session (see [`BrowserSessionResolver`]).
    pub async fn fetch_session(&self) -> Option<Session> {
        self.resolver.fetch_session().await
    }

    /// A valid access token for API calls.
    ///
    /// # Errors
    /// When signed out or when the refresh fails.
    pub async fn access_token(&self) -> Result<String> {
        self.resolver.access_token().await
    }

    /// Current token set without refreshing.
    #[must_use]
    pub fn tokens(&self) -> Option<TokenSet> {
        self.tokens.get_stored_tokens()
    }

    /// Whether unexpired tokens are present. Does not contact the provider.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.tokens
            .get_stored_tokens()
            .is_some_and(|t| !t.is_expired_at(self.clock.now_ms(), self.config().refresh_buffer_ms))
    }

    /// Clear the session and return the end-session URL.
    pub async fn sign_out(&self) -> String {
        self.flow.cancel();
        let url = self.resolver.sign_out().await;
        info!("client signed out");
        url
    }

    #[must_use]
    pub fn has_pending_login(&self) -> bool {
        self.flow.pending_attempt().is_some()
    }

    #[must_use]
    pub fn resolver(&self) -> &BrowserSessionResolver<P, Arc<S>> {
        &self.resolver
    }
}

#[async_trait::async_trait]
impl<P, S> SessionResolver for SsoClient<P, S>
where
    P: IdentityProvider + 'static,
    S: SessionStorage + 'static,
{
    async fn resolve_session(&self) -> Option<Session> {
        self.fetch_session().await
    }
}

impl<P, S> std::fmt::Debug for SsoClient<P, S>
where
    P: IdentityProvider + 'static,
    S: SessionStorage + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SsoClient")
            .field("client_id", &self.config().client_id)
            .field("identity_base_url", &self.config().identity_base_url)
            .finish_non_exhaustive()
    }
}
