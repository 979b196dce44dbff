//! Ports for identity-provider access, tab-scoped storage and the
//! environment
//!
//! These traits enable dependency injection and testing by abstracting
//! external dependencies (the identity provider, `sessionStorage`, the wall
//! clock, browser navigation). Adapters live in `ssokit-infra`; mocks live in
//! [`crate::testing`].

use std::sync::Arc;

use async_trait::async_trait;
use ssokit_domain::{Result, Session, SsoConfig, TokenResponse, TokenTypeHint, UserInfoClaims};

/// Authorization-code exchange inputs.
#[derive(Clone, PartialEq, Eq)]
pub struct ExchangeParams {
    pub code: String,
    pub code_verifier: String,
    pub redirect_uri: String,
}

impl std::fmt::Debug for ExchangeParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangeParams")
            .field("code", &"<redacted>")
            .field("code_verifier", &"<redacted>")
            .field("redirect_uri", &self.redirect_uri)
            .finish()
    }
}

/// Identity provider token, UserInfo and revocation endpoints
///
/// Token grants and revocation are never retried. Every non-2xx response is
/// surfaced as a classified [`ssokit_domain::SsoError`] and the caller
/// decides whether the session survives.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Exchange an authorization code for tokens
    ///
    /// # Errors
    /// [`ssokit_domain::SsoError::TokenExchange`] with the HTTP status and
    /// body for non-2xx responses, `Network` if the request fails.
    async fn exchange_code(&self, params: &ExchangeParams) -> Result<TokenResponse>;

    /// Run the refresh-token grant
    ///
    /// # Errors
    /// [`ssokit_domain::SsoError::TokenRefresh`] for non-2xx responses. The
    /// caller must treat any failure as full session loss.
    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenResponse>;

    /// Fetch UserInfo claims with a bearer access token
    ///
    /// # Errors
    /// [`ssokit_domain::SsoError::UserInfo`] carrying the status for non-2xx
    /// responses, so callers can distinguish 401 from transient failures.
    async fn fetch_user_info(&self, access_token: &str) -> Result<UserInfoClaims>;

    /// Revoke a token (RFC 7009)
    ///
    /// # Errors
    /// [`ssokit_domain::SsoError::Revocation`] for non-2xx responses.
    async fn revoke_token(&self, token: &str, hint: TokenTypeHint) -> Result<()>;

    /// Client registration this provider was built with.
    fn config(&self) -> &SsoConfig;
}

#[async_trait]
impl<P: IdentityProvider + ?Sized> IdentityProvider for Arc<P> {
    async fn exchange_code(&self, params: &ExchangeParams) -> Result<TokenResponse> {
        (**self).exchange_code(params).await
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenResponse> {
        (**self).refresh_token(refresh_token).await
    }

    async fn fetch_user_info(&self, access_token: &str) -> Result<UserInfoClaims> {
        (**self).fetch_user_info(access_token).await
    }

    async fn revoke_token(&self, token: &str, hint: TokenTypeHint) -> Result<()> {
        (**self).revoke_token(token, hint).await
    }

    fn config(&self) -> &SsoConfig {
        (**self).config()
    }
}

/// Tab-scoped key/value storage (the `sessionStorage` analogue)
///
/// Any call may fail (private browsing, quota); callers degrade rather than
/// propagate.
pub trait SessionStorage: Send + Sync {
    /// # Errors
    /// [`ssokit_domain::SsoError::Storage`] if the backend is unavailable.
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// # Errors
    /// [`ssokit_domain::SsoError::Storage`] if the write is rejected.
    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// # Errors
    /// [`ssokit_domain::SsoError::Storage`] if the backend is unavailable.
    fn remove_item(&self, key: &str) -> Result<()>;
}

impl<S: SessionStorage + ?Sized> SessionStorage for Arc<S> {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        (**self).remove_item(key)
    }
}

/// Wall-clock source in epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Anything that can resolve the current session, fail-closed.
#[async_trait]
pub trait SessionResolver: Send + Sync {
    async fn resolve_session(&self) -> Option<Session>;
}

#[async_trait]
impl<R: SessionResolver + ?Sized> SessionResolver for Arc<R> {
    async fn resolve_session(&self) -> Option<Session> {
        (**self).resolve_session().await
    }
}

/// Top-level navigation (`window.location` analogue).
pub trait Navigator: Send + Sync {
    fn navigate(&self, url: &str);
}
