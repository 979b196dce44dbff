//! Client configuration
//!
//! [`SsoConfig`] replaces the one-time global `configure()` step with an
//! explicit value handed to every client, store and resolver. Required
//! fields are constructor parameters; optional fields have defaults and
//! `with_*` overrides.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::constants::{
    AUTHORIZE_PATH, DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_REFRESH_BUFFER_MS, DEFAULT_SCOPES,
    END_SESSION_PATH, REVOKE_PATH, TOKEN_PATH, USERINFO_PATH,
};
use crate::errors::{Result, SsoError};

fn default_scopes() -> Vec<String> {
    DEFAULT_SCOPES.iter().map(|s| (*s).to_string()).collect()
}

const fn default_true() -> bool {
    true
}

const fn default_refresh_buffer_ms() -> i64 {
    DEFAULT_REFRESH_BUFFER_MS
}

const fn default_http_timeout_secs() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

/// Identity provider and client registration settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SsoConfig {
    /// Base URL of the identity provider (e.g. `https://id.example.com`)
    pub identity_base_url: String,

    /// Registered OAuth client id
    pub client_id: String,

    /// Callback URL registered for this client
    pub redirect_uri: String,

    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,

    /// Gates redirect to login when unauthenticated
    #[serde(default = "default_true")]
    pub auto_redirect: bool,

    #[serde(default)]
    pub post_logout_redirect_uri: Option<String>,

    /// Treat tokens as expired this many milliseconds early
    #[serde(default = "default_refresh_buffer_ms")]
    pub refresh_buffer_ms: i64,

    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

/// Caller options merged over configured defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub scopes: Option<Vec<String>>,
    pub auto_redirect: Option<bool>,
    pub post_logout_redirect_uri: Option<String>,
}

impl SsoConfig {
    #[must_use]
    pub fn new(
        identity_base_url: impl Into<String>,
        client_id: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            identity_base_url: identity_base_url.into(),
            client_id: client_id.into(),
            redirect_uri: redirect_uri.into(),
            scopes: default_scopes(),
            auto_redirect: true,
            post_logout_redirect_uri: None,
            refresh_buffer_ms: DEFAULT_REFRESH_BUFFER_MS,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }

    #[must_use]
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    #[must_use]
    pub fn with_auto_redirect(mut self, auto_redirect: bool) -> Self {
        self.auto_redirect = auto_redirect;
        self
    }

    #[must_use]
    pub fn with_post_logout_redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.post_logout_redirect_uri = Some(uri.into());
        self
    }

    #[must_use]
    pub fn with_refresh_buffer_ms(mut self, buffer_ms: i64) -> Self {
        self.refresh_buffer_ms = buffer_ms;
        self
    }

    #[must_use]
    pub fn with_http_timeout_secs(mut self, secs: u64) -> Self {
        self.http_timeout_secs = secs;
        self
    }

    /// Apply caller overrides; unset fields keep their current values.
    #[must_use]
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(scopes) = overrides.scopes {
            self.scopes = scopes;
        }
        if let Some(auto_redirect) = overrides.auto_redirect {
            self.auto_redirect = auto_redirect;
        }
        if overrides.post_logout_redirect_uri.is_some() {
            self.post_logout_redirect_uri = overrides.post_logout_redirect_uri;
        }
        self
    }

    /// Check that required fields are present and URLs parse.
    ///
    /// # Errors
    /// Returns [`SsoError::Configuration`] describing the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.client_id.trim().is_empty() {
            return Err(SsoError::Configuration("client_id is required".to_string()));
        }
        let base = parse_url("identity_base_url", &self.identity_base_url)?;
        if base.cannot_be_a_base() {
            return Err(SsoError::Configuration(format!(
                "identity_base_url is not a base URL: {}",
                self.identity_base_url
            )));
        }
        parse_url("redirect_uri", &self.redirect_uri)?;
        if let Some(uri) = &self.post_logout_redirect_uri {
            parse_url("post_logout_redirect_uri", uri)?;
        }
        if self.scopes.is_empty() {
            return Err(SsoError::Configuration("at least one scope is required".to_string()));
        }
        if self.refresh_buffer_ms < 0 {
            return Err(SsoError::Configuration("refresh_buffer_ms must be >= 0".to_string()));
        }
        Ok(())
    }

    #[must_use]
    pub fn authorize_endpoint(&self) -> String {
        join_endpoint(&self.identity_base_url, AUTHORIZE_PATH)
    }

    #[must_use]
    pub fn token_endpoint(&self) -> String {
        join_endpoint(&self.identity_base_url, TOKEN_PATH)
    }

    #[must_use]
    pub fn userinfo_endpoint(&self) -> String {
        join_endpoint(&self.identity_base_url, USERINFO_PATH)
    }

    #[must_use]
    pub fn revoke_endpoint(&self) -> String {
        join_endpoint(&self.identity_base_url, REVOKE_PATH)
    }

    #[must_use]
    pub fn end_session_endpoint(&self) -> String {
        join_endpoint(&self.identity_base_url, END_SESSION_PATH)
    }
}

/// Join an identity-provider base URL and an endpoint path, tolerating a
/// trailing slash on the base.
#[must_use]
pub fn join_endpoint(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}

fn parse_url(field: &str, value: &str) -> Result<Url> {
    Url::parse(value).map_err(|e| SsoError::Configuration(format!("{field}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SsoConfig {
        SsoConfig::new("https://id.example.com/", "abc", "https://app.example.com/callback")
    }

    #[test]
    fn defaults() {
        let config = config();
        assert_eq!(config.scopes, vec!["openid", "profile", "email", "offline_access"]);
        assert!(config.auto_redirect);
        assert_eq!(config.refresh_buffer_ms, 30_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn endpoints_tolerate_trailing_slash() {
        assert_eq!(config().token_endpoint(), "https://id.example.com/api/auth/oauth2/token");
        assert_eq!(
            config().end_session_endpoint(),
            "https://id.example.com/api/auth/oauth2/end-session"
        );
    }

    #[test]
    fn overrides_merge_over_defaults() {
        let merged = config().with_overrides(ConfigOverrides {
            scopes: Some(vec!["openid".into()]),
            auto_redirect: None,
            post_logout_redirect_uri: None,
        });
        assert_eq!(merged.scopes, vec!["openid"]);
        assert!(merged.auto_redirect);
    }

    #[test]
    fn validate_rejects_missing_client_id() {
        let err = SsoConfig::new("https://id.example.com", " ", "https://app/cb")
            .validate()
            .unwrap_err();
        assert!(matches!(err, SsoError::Configuration(_)));
    }

    #[test]
    fn validate_rejects_bad_urls() {
        assert!(SsoConfig::new("not a url", "abc", "https://app/cb").validate().is_err());
        assert!(SsoConfig::new("https://id", "abc", "callback").validate().is_err());
    }

    #[test]
    fn deserializes_with_defaults() {
        let parsed: SsoConfig = serde_json::from_str(
            r#"{"identity_base_url":"https://id.example.com","client_id":"abc","redirect_uri":"https://app/cb"}"#,
        )
        .unwrap();
        assert_eq!(parsed, SsoConfig::new("https://id.example.com", "abc", "https://app/cb"));
    }
}
