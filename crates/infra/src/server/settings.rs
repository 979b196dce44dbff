//! Server integration settings

use serde::{Deserialize, Serialize};
use ssokit_domain::constants::{DEFAULT_AUTH_PATH, DEFAULT_LOGIN_URL};
use ssokit_domain::{Result, SsoError};

/// Cookie and redirect settings for the axum integration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Prefix for cookie names (`{prefix}_access_token`, ...)
    pub cookie_prefix: String,
    /// Shared `Max-Age` of the four session cookies
    pub cookie_max_age_days: i64,
    /// `Secure` attribute; disable only for plain-HTTP development
    pub secure_cookies: bool,
    /// Mount point of the login/callback/logout/session routes
    pub auth_path: String,
    /// Where a successful callback lands when the attempt has no return path
    pub login_redirect: String,
    /// Where logout lands when RP-initiated logout is disabled
    pub logout_redirect: String,
    /// Callback failures redirect here with `?error=<code>`
    pub error_redirect: String,
    /// Login route that `require_server_session` sends users to
    pub login_path: String,
    /// Send logout through the provider's end-session endpoint
    pub rp_initiated_logout: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            cookie_prefix: "sso".to_string(),
            cookie_max_age_days: 30,
            secure_cookies: true,
            auth_path: DEFAULT_AUTH_PATH.to_string(),
            login_redirect: "/".to_string(),
            logout_redirect: "/".to_string(),
            error_redirect: "/".to_string(),
            login_path: DEFAULT_LOGIN_URL.to_string(),
            rp_initiated_logout: true,
        }
    }
}

impl ServerSettings {
    #[must_use]
    pub fn access_cookie(&self) -> String {
        format!("{}_access_token", self.cookie_prefix)
    }

    #[must_use]
    pub fn refresh_cookie(&self) -> String {
        format!("{}_refresh_token", self.cookie_prefix)
    }

    #[must_use]
    pub fn id_cookie(&self) -> String {
        format!("{}_id_token", self.cookie_prefix)
    }

    #[must_use]
    pub fn expires_cookie(&self) -> String {
        format!("{}_expires_at", self.cookie_prefix)
    }

    #[must_use]
    pub fn attempt_cookie(&self) -> String {
        format!("{}_login_attempt", self.cookie_prefix)
    }

    /// Route path under `auth_path`, e.g. `route("callback")`.
    #[must_use]
    pub fn route(&self, name: &str) -> String {
        format!("{}/{name}", self.auth_path.trim_end_matches('/'))
    }

    /// `error_redirect` carrying an error code.
    #[must_use]
    pub fn error_url(&self, code: &str) -> String {
        let separator = if self.error_redirect.contains('?') { '&' } else { '?' };
        format!("{}{separator}error={}", self.error_redirect, urlencode(code))
    }

    /// # Errors
    /// [`SsoError::Configuration`] if a path or the cookie prefix is unusable.
    pub fn validate(&self) -> Result<()> {
        if self.cookie_prefix.is_empty()
            || !self.cookie_prefix.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(SsoError::Configuration(format!(
                "cookie_prefix must be non-empty [A-Za-z0-9_-]: {:?}",
                self.cookie_prefix
            )));
        }
        if !self.auth_path.starts_with('/') {
            return Err(SsoError::Configuration("auth_path must start with '/'".to_string()));
        }
        if self.cookie_max_age_days <= 0 {
            return Err(SsoError::Configuration("cookie_max_age_days must be > 0".to_string()));
        }
        Ok(())
    }
}

fn urlencode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}
