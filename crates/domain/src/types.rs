//! Token, session and user types
//!
//! The [`TokenSet`] is the durable source of truth for "who is logged in";
//! a [`Session`] is always recomputed from it plus a live UserInfo call and
//! is never persisted itself.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_EXPIRES_IN_SECS, DEFAULT_ROLE};

/// Per-application role grants, keyed by application id.
pub type AppRoles = BTreeMap<String, Vec<String>>;

/// PKCE verifier/challenge pair for one login attempt (RFC 7636).
///
/// The verifier never leaves the client except in the final token exchange;
/// only the challenge is placed in the authorization URL.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PkcePair {
    pub code_verifier: String,
    pub code_challenge: String,
}

impl fmt::Debug for PkcePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PkcePair")
            .field("code_verifier", &"<redacted>")
            .field("code_challenge", &self.code_challenge)
            .finish()
    }
}

/// Access/refresh/id tokens for one execution context.
///
/// Stored with camelCase keys so the persisted shape is
/// `{accessToken, expiresAt, refreshToken?, idToken?}`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenSet {
    /// Bearer token for API and UserInfo calls
    pub access_token: String,

    /// Absolute expiry, epoch milliseconds
    pub expires_at: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
}

impl TokenSet {
    /// Create a token set without refresh or id tokens.
    #[must_use]
    pub fn new(access_token: impl Into<String>, expires_at: i64) -> Self {
        Self { access_token: access_token.into(), expires_at, refresh_token: None, id_token: None }
    }

    #[must_use]
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    #[must_use]
    pub fn with_id_token(mut self, id_token: impl Into<String>) -> Self {
        self.id_token = Some(id_token.into());
        self
    }

    /// Build a token set from a token endpoint response received at `now_ms`.
    #[must_use]
    pub fn from_response(response: TokenResponse, now_ms: i64) -> Self {
        Self {
            expires_at: now_ms.saturating_add(response.expires_in.saturating_mul(1000)),
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            id_token: response.id_token,
        }
    }

    /// Replacement set after a refresh grant.
    ///
    /// The set is replaced wholesale, except that an omitted `refresh_token`
    /// means "keep using the previous one" and an omitted `id_token` keeps
    /// the previous id token for end-session hints.
    #[must_use]
    pub fn rotate(previous: &Self, response: TokenResponse, now_ms: i64) -> Self {
        let mut next = Self::from_response(response, now_ms);
        if next.refresh_token.is_none() {
            next.refresh_token.clone_from(&previous.refresh_token);
        }
        if next.id_token.is_none() {
            next.id_token.clone_from(&previous.id_token);
        }
        next
    }

    /// `true` once `now_ms` is within `buffer_ms` of the expiry.
    #[must_use]
    pub fn is_expired_at(&self, now_ms: i64, buffer_ms: i64) -> bool {
        now_ms >= self.expires_at.saturating_sub(buffer_ms)
    }

    /// Expiry as a UTC timestamp.
    #[must_use]
    pub fn expires_at_utc(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.expires_at).unwrap_or_default()
    }
}

impl fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSet")
            .field("access_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("id_token", &self.id_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

fn default_expires_in() -> i64 {
    DEFAULT_EXPIRES_IN_SECS
}

/// Token endpoint response (RFC 6749 §5.1).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default = "default_expires_in")]
    pub expires_in: i64,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// `token_type_hint` values for the revocation endpoint (RFC 7009).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenTypeHint {
    AccessToken,
    RefreshToken,
}

impl TokenTypeHint {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AccessToken => "access_token",
            Self::RefreshToken => "refresh_token",
        }
    }
}

/// Normalized projection of identity-provider claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: String,
    pub email: Option<String>,
    pub email_verified: bool,
    pub name: Option<String>,
    pub username: Option<String>,
    pub image: Option<String>,
    pub roles: Vec<String>,
    pub app_roles: AppRoles,
}

impl User {
    /// A user with only an id and the default role set.
    #[must_use]
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            email: None,
            email_verified: false,
            name: None,
            username: None,
            image: None,
            roles: vec![DEFAULT_ROLE.to_string()],
            app_roles: AppRoles::new(),
        }
    }
}

/// Resolved login session. Recomputed on every resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub session_id: String,
    pub user: User,
    /// Serialized as ISO-8601
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(refresh: Option<&str>) -> TokenResponse {
        TokenResponse {
            access_token: "at-2".into(),
            token_type: "Bearer".into(),
            expires_in: 600,
            refresh_token: refresh.map(str::to_string),
            id_token: None,
            scope: None,
        }
    }

    #[test]
    fn token_set_uses_camel_case_keys() {
        let tokens = TokenSet::new("at", 1_700_000_000_000).with_refresh_token("rt");
        let json = serde_json::to_value(&tokens).unwrap();
        assert_eq!(json["accessToken"], "at");
        assert_eq!(json["expiresAt"], 1_700_000_000_000_i64);
        assert_eq!(json["refreshToken"], "rt");
        assert!(json.get("idToken").is_none());
    }

    #[test]
    fn from_response_computes_absolute_expiry() {
        let tokens = TokenSet::from_response(response(Some("rt-2")), 1_000);
        assert_eq!(tokens.expires_at, 601_000);
        assert_eq!(tokens.refresh_token.as_deref(), Some("rt-2"));
    }

    #[test]
    fn rotate_keeps_previous_refresh_token_when_omitted() {
        let previous = TokenSet::new("at-1", 0).with_refresh_token("rt-1").with_id_token("id-1");
        let next = TokenSet::rotate(&previous, response(None), 5_000);
        assert_eq!(next.access_token, "at-2");
        assert_eq!(next.refresh_token.as_deref(), Some("rt-1"));
        assert_eq!(next.id_token.as_deref(), Some("id-1"));
    }

    #[test]
    fn rotate_prefers_new_refresh_token() {
        let previous = TokenSet::new("at-1", 0).with_refresh_token("rt-1");
        let next = TokenSet::rotate(&previous, response(Some("rt-2")), 5_000);
        assert_eq!(next.refresh_token.as_deref(), Some("rt-2"));
    }

    #[test]
    fn token_response_defaults() {
        let parsed: TokenResponse = serde_json::from_str(r#"{"access_token":"x"}"#).unwrap();
        assert_eq!(parsed.token_type, "Bearer");
        assert_eq!(parsed.expires_in, DEFAULT_EXPIRES_IN_SECS);
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let tokens = TokenSet::new("secret-at", 0).with_refresh_token("secret-rt");
        let rendered = format!("{tokens:?}");
        assert!(!rendered.contains("secret-at"));
        assert!(!rendered.contains("secret-rt"));
    }

    #[test]
    fn session_expiry_serializes_as_iso8601() {
        let session = Session {
            session_id: "s".into(),
            user: User::new("u"),
            expires_at: TokenSet::new("at", 1_700_000_000_000).expires_at_utc(),
        };
        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["expiresAt"], "2023-11-14T22:13:20Z");
        assert_eq!(json["user"]["roles"], serde_json::json!(["user"]));
    }
}
