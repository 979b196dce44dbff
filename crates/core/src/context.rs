//! Auth context provider
//!
//! [`AuthProvider`] owns the resolved session for one UI subtree and
//! publishes it through a `tokio::sync::watch` channel. It is
//! framework-neutral: bindings subscribe and re-render on change.
//!
//! Lifecycle:
//! - [`AuthProvider::mount`] with a pre-resolved session (server
//!   rendering) marks loading complete without fetching; without one it
//!   resolves once.
//! - [`AuthProvider::refresh`] re-runs resolution on demand.
//! - [`AuthProvider::unmount`] flips the liveness flag; resolutions still in
//!   flight finish but never write state afterwards.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use ssokit_domain::constants::{DEFAULT_LOGIN_URL, DEFAULT_SCOPES};
use ssokit_domain::{ConfigOverrides, Session, SsoConfig, User};
use tokio::sync::watch;
use tracing::debug;

use crate::ports::SessionResolver;

/// Caller options; unset fields fall back to defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderOptions {
    pub scopes: Option<Vec<String>>,
    pub auto_redirect: Option<bool>,
    /// Application route that starts a login (receives `returnTo`)
    pub login_url: Option<String>,
}

/// Effective provider configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub scopes: Vec<String>,
    pub auto_redirect: bool,
    pub login_url: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            scopes: DEFAULT_SCOPES.iter().map(|s| (*s).to_string()).collect(),
            auto_redirect: true,
            login_url: DEFAULT_LOGIN_URL.to_string(),
        }
    }
}

impl ProviderConfig {
    /// Merge `options` over the defaults.
    #[must_use]
    pub fn merged(options: ProviderOptions) -> Self {
        let defaults = Self::default();
        Self {
            scopes: options.scopes.unwrap_or(defaults.scopes),
            auto_redirect: options.auto_redirect.unwrap_or(defaults.auto_redirect),
            login_url: options.login_url.unwrap_or(defaults.login_url),
        }
    }

    /// Merge `options` over the client's configured scopes and
    /// `auto_redirect`.
    #[must_use]
    pub fn from_config(config: &SsoConfig, options: ProviderOptions) -> Self {
        Self {
            scopes: options.scopes.unwrap_or_else(|| config.scopes.clone()),
            auto_redirect: options.auto_redirect.unwrap_or(config.auto_redirect),
            login_url: options.login_url.unwrap_or_else(|| DEFAULT_LOGIN_URL.to_string()),
        }
    }

    /// The fields this provider overrides on the client configuration.
    #[must_use]
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            scopes: Some(self.scopes.clone()),
            auto_redirect: Some(self.auto_redirect),
            post_logout_redirect_uri: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthState {
    pub session: Option<Session>,
    pub is_loading: bool,
}

impl AuthState {
    fn loading() -> Self {
        Self { session: None, is_loading: true }
    }
}

/// What consumers read from the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContextValue {
    pub session: Option<Session>,
    pub user: Option<User>,
    pub is_loading: bool,
    pub is_authenticated: bool,
    pub config: ProviderConfig,
}

impl AuthContextValue {
    #[must_use]
    pub fn new(state: AuthState, config: ProviderConfig) -> Self {
        Self {
            user: state.session.as_ref().map(|s| s.user.clone()),
            is_authenticated: state.session.is_some(),
            session: state.session,
            is_loading: state.is_loading,
            config,
        }
    }
}

/// Session holder for one subtree
pub struct AuthProvider<R: SessionResolver> {
    resolver: R,
    config: ProviderConfig,
    state: watch::Sender<AuthState>,
    alive: AtomicBool,
    generation: AtomicU64,
}

impl<R: SessionResolver> AuthProvider<R> {
    #[must_use]
    pub fn new(resolver: R, options: ProviderOptions) -> Self {
        Self::with_config(resolver, ProviderConfig::merged(options))
    }

    /// Provider with an already merged configuration.
    #[must_use]
    pub fn with_config(resolver: R, config: ProviderConfig) -> Self {
        let (state, _) = watch::channel(AuthState::loading());
        Self { resolver, config, state, alive: AtomicBool::new(true), generation: AtomicU64::new(0) }
    }

    /// Initialize, skipping resolution when a session was pre-resolved.
    pub async fn mount(&self, initial: Option<Session>) {
        if let Some(session) = initial {
            debug!("auth provider mounted with pre-resolved session");
            self.generation.fetch_add(1, Ordering::SeqCst);
            self.publish(AuthState { session: Some(session), is_loading: false });
            return;
        }
        let _ = self.refresh().await;
    }

    /// Re-run session resolution.
    ///
    /// Only the most recent resolution is published; a slower, older one
    /// finishing later is dropped.
    pub async fn refresh(&self) -> Option<Session> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let session = self.resolver.resolve_session().await;

        if !self.is_mounted() {
            debug!("auth provider unmounted during resolution; discarding result");
            return session;
        }
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!("superseded session resolution; discarding result");
            return session;
        }

        self.publish(AuthState { session: session.clone(), is_loading: false });
        session
    }

    pub fn unmount(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn snapshot(&self) -> AuthContextValue {
        AuthContextValue::new(self.state.borrow().clone(), self.config.clone())
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    fn publish(&self, next: AuthState) {
        if self.is_mounted() {
            self.state.send_replace(next);
        }
    }
}
