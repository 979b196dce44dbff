//! Mock implementations of SSOKit ports
//!
//! Available to this crate's unit tests and, through the `test-utils`
//! feature, to downstream test suites.

// Test mocks: error conditions are configured by the caller
#![allow(clippy::missing_errors_doc)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use ssokit_domain::{
    ProtocolError, Result, Session, SsoConfig, SsoError, TokenResponse, TokenTypeHint,
    UserInfoClaims,
};

use crate::ports::{Clock, ExchangeParams, IdentityProvider, Navigator, SessionResolver, SessionStorage};

/// Token response with the given access and refresh tokens.
#[must_use]
pub fn token_response(access_token: &str, refresh_token: Option<&str>) -> TokenResponse {
    TokenResponse {
        access_token: access_token.to_string(),
        token_type: "Bearer".to_string(),
        expires_in: 3600,
        refresh_token: refresh_token.map(str::to_string),
        id_token: None,
        scope: Some("openid profile email offline_access".to_string()),
    }
}

/// Configuration pointing at a fictional provider.
#[must_use]
pub fn test_config() -> SsoConfig {
    SsoConfig::new("https://id.example.com", "test-client", "https://app.example.com/callback")
}

/// Mock identity provider
///
/// Responses are configurable per endpoint and every call is counted. An
/// optional delay on the refresh grant lets tests overlap concurrent
/// callers.
pub struct MockIdentityProvider {
    config: SsoConfig,
    exchange_response: Mutex<Result<TokenResponse>>,
    refresh_response: Mutex<Result<TokenResponse>>,
    userinfo_response: Mutex<Result<UserInfoClaims>>,
    revoke_response: Mutex<Result<()>>,
    refresh_delay: Mutex<Option<Duration>>,
    exchange_calls: AtomicUsize,
    refresh_calls: AtomicUsize,
    userinfo_calls: AtomicUsize,
    revoke_calls: AtomicUsize,
    last_exchange: Mutex<Option<ExchangeParams>>,
    refreshed_with: Mutex<Vec<String>>,
    userinfo_tokens: Mutex<Vec<String>>,
    revoked: Mutex<Vec<(String, TokenTypeHint)>>,
}

impl MockIdentityProvider {
    /// Provider that succeeds on every endpoint.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    #[must_use]
    pub fn with_config(config: SsoConfig) -> Self {
        Self {
            config,
            exchange_response: Mutex::new(Ok(token_response("exchanged-access", Some("exchanged-refresh")))),
            refresh_response: Mutex::new(Ok(token_response("refreshed-access", Some("refreshed-refresh")))),
            userinfo_response: Mutex::new(Ok(UserInfoClaims::new("user-1"))),
            revoke_response: Mutex::new(Ok(())),
            refresh_delay: Mutex::new(None),
            exchange_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            userinfo_calls: AtomicUsize::new(0),
            revoke_calls: AtomicUsize::new(0),
            last_exchange: Mutex::new(None),
            refreshed_with: Mutex::new(Vec::new()),
            userinfo_tokens: Mutex::new(Vec::new()),
            revoked: Mutex::new(Vec::new()),
        }
    }

    pub fn set_exchange_response(&self, response: Result<TokenResponse>) {
        *self.exchange_response.lock() = response;
    }

    pub fn set_refresh_response(&self, response: Result<TokenResponse>) {
        *self.refresh_response.lock() = response;
    }

    /// Make the refresh grant fail with `invalid_grant`.
    pub fn fail_refresh_with_invalid_grant(&self) {
        self.set_refresh_response(Err(SsoError::TokenRefresh(ProtocolError::InvalidGrant {
            status: 400,
            body: r#"{"error":"invalid_grant"}"#.to_string(),
        })));
    }

    pub fn set_user_info(&self, claims: UserInfoClaims) {
        *self.userinfo_response.lock() = Ok(claims);
    }

    /// Make UserInfo answer with the given HTTP status.
    pub fn fail_user_info(&self, status: u16) {
        *self.userinfo_response.lock() = Err(SsoError::UserInfo { status, body: String::new() });
    }

    pub fn set_user_info_response(&self, response: Result<UserInfoClaims>) {
        *self.userinfo_response.lock() = response;
    }

    pub fn set_revoke_response(&self, response: Result<()>) {
        *self.revoke_response.lock() = response;
    }

    pub fn set_refresh_delay(&self, delay: Duration) {
        *self.refresh_delay.lock() = Some(delay);
    }

    #[must_use]
    pub fn exchange_calls(&self) -> usize {
        self.exchange_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn userinfo_calls(&self) -> usize {
        self.userinfo_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn revoke_calls(&self) -> usize {
        self.revoke_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn last_exchange(&self) -> Option<ExchangeParams> {
        self.last_exchange.lock().clone()
    }

    /// Refresh tokens presented to the refresh grant, in call order.
    #[must_use]
    pub fn refreshed_with(&self) -> Vec<String> {
        self.refreshed_with.lock().clone()
    }

    /// Access tokens presented to UserInfo, in call order.
    #[must_use]
    pub fn userinfo_tokens(&self) -> Vec<String> {
        self.userinfo_tokens.lock().clone()
    }

    #[must_use]
    pub fn revoked(&self) -> Vec<(String, TokenTypeHint)> {
        self.revoked.lock().clone()
    }
}

impl Default for MockIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    async fn exchange_code(&self, params: &ExchangeParams) -> Result<TokenResponse> {
        self.exchange_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_exchange.lock() = Some(params.clone());
        self.exchange_response.lock().clone()
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenResponse> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        self.refreshed_with.lock().push(refresh_token.to_string());

        let delay = *self.refresh_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.refresh_response.lock().clone()
    }

    async fn fetch_user_info(&self, access_token: &str) -> Result<UserInfoClaims> {
        self.userinfo_calls.fetch_add(1, Ordering::SeqCst);
        self.userinfo_tokens.lock().push(access_token.to_string());
        self.userinfo_response.lock().clone()
    }

    async fn revoke_token(&self, token: &str, hint: TokenTypeHint) -> Result<()> {
        self.revoke_calls.fetch_add(1, Ordering::SeqCst);
        self.revoked.lock().push((token.to_string(), hint));
        self.revoke_response.lock().clone()
    }

    fn config(&self) -> &SsoConfig {
        &self.config
    }
}

/// In-memory [`SessionStorage`].
#[derive(Debug, Default)]
pub struct MockStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MockStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn raw(&self, key: &str) -> Option<String> {
        self.items.lock().get(key).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }
}

impl SessionStorage for MockStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items.lock().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.items.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.items.lock().remove(key);
        Ok(())
    }
}

/// Storage whose every operation fails, like `sessionStorage` in some
/// private-browsing modes.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingStorage;

impl SessionStorage for FailingStorage {
    fn get_item(&self, _key: &str) -> Result<Option<String>> {
        Err(SsoError::Storage("storage unavailable".to_string()))
    }

    fn set_item(&self, _key: &str, _value: &str) -> Result<()> {
        Err(SsoError::Storage("quota exceeded".to_string()))
    }

    fn remove_item(&self, _key: &str) -> Result<()> {
        Err(SsoError::Storage("storage unavailable".to_string()))
    }
}

/// Manually advanced clock.
#[derive(Debug, Default)]
pub struct MockClock {
    now_ms: AtomicI64,
}

impl MockClock {
    #[must_use]
    pub fn new(now_ms: i64) -> Self {
        Self { now_ms: AtomicI64::new(now_ms) }
    }

    pub fn set(&self, now_ms: i64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        let by = i64::try_from(by.as_millis()).unwrap_or(i64::MAX);
        self.now_ms.fetch_add(by, Ordering::SeqCst);
    }
}

impl Clock for MockClock {
    fn now_ms(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

/// Navigator that records every target.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    visited: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn visited(&self) -> Vec<String> {
        self.visited.lock().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, url: &str) {
        self.visited.lock().push(url.to_string());
    }
}

/// Resolver returning a fixed answer after an optional delay.
pub struct StaticResolver {
    session: Mutex<Option<Session>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl StaticResolver {
    #[must_use]
    pub fn new(session: Option<Session>) -> Self {
        Self { session: Mutex::new(session), delay: None, calls: AtomicUsize::new(0) }
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set_session(&self, session: Option<Session>) {
        *self.session.lock() = session;
    }

    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionResolver for StaticResolver {
    async fn resolve_session(&self) -> Option<Session> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.session.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_provider_counts_calls() {
        let provider = MockIdentityProvider::new();
        assert_eq!(provider.refresh_calls(), 0);

        let tokens = provider.refresh_token("rt-1").await.unwrap();
        assert_eq!(tokens.access_token, "refreshed-access");
        assert_eq!(provider.refresh_calls(), 1);
        assert_eq!(provider.refreshed_with(), vec!["rt-1"]);
    }

    #[tokio::test]
    async fn mock_provider_failure_is_configurable() {
        let provider = MockIdentityProvider::new();
        provider.fail_refresh_with_invalid_grant();
        let err = provider.refresh_token("rt-1").await.unwrap_err();
        assert_eq!(err.label(), "invalid_grant");
    }

    #[test]
    fn failing_storage_fails_everything() {
        assert!(FailingStorage.get_item("k").is_err());
        assert!(FailingStorage.set_item("k", "v").is_err());
        assert!(FailingStorage.remove_item("k").is_err());
    }

    #[test]
    fn mock_clock_advances() {
        let clock = MockClock::new(1_000);
        clock.advance(Duration::from_secs(2));
        assert_eq!(clock.now_ms(), 3_000);
    }
}
