//! Error types used throughout SSOKit
//!
//! Every failure is classified so callers can decide between "the session is
//! gone, re-authenticate" and "try again later". Network and protocol
//! failures never surface to end users directly: resolvers turn them into a
//! signed-out state and server handlers turn them into redirects.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// OAuth error response body (RFC 6749 §5.2).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

/// Classified non-2xx response from the identity provider's token or revoke
/// endpoints.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The grant (refresh token or code) is dead; full re-authentication is
    /// required.
    #[error("invalid_grant (HTTP {status}): {body}")]
    InvalidGrant { status: u16, body: String },

    /// Provider-side or rate-limit failure; safe to retry later.
    #[error("transient provider failure (HTTP {status}): {body}")]
    Transient { status: u16, body: String },

    /// Any other client error (bad client id, malformed request, ...).
    #[error("request rejected (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },
}

impl ProtocolError {
    /// Classify a non-2xx response by its OAuth error code and HTTP status.
    #[must_use]
    pub fn classify(status: u16, body: &str) -> Self {
        let code = serde_json::from_str::<OAuthErrorResponse>(body).ok().map(|e| e.error);
        let body = body.to_string();

        if code.as_deref() == Some("invalid_grant") {
            Self::InvalidGrant { status, body }
        } else if status >= 500 || status == 429 || status == 408 {
            Self::Transient { status, body }
        } else {
            Self::Rejected { status, body }
        }
    }

    /// HTTP status that produced this error.
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            Self::InvalidGrant { status, .. }
            | Self::Transient { status, .. }
            | Self::Rejected { status, .. } => *status,
        }
    }
}

/// Main error type for SSOKit
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SsoError {
    /// Client used before (or with an invalid) configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The HTTP request itself failed (offline, DNS, TLS, timeout).
    #[error("Network error: {0}")]
    Network(String),

    /// Authorization code exchange returned a non-2xx response.
    #[error("Token exchange failed (HTTP {status}): {body}")]
    TokenExchange { status: u16, body: String },

    /// Refresh-token grant failed. Never retried automatically.
    #[error("Token refresh failed: {0}")]
    TokenRefresh(ProtocolError),

    /// UserInfo endpoint returned a non-2xx response.
    #[error("UserInfo request failed (HTTP {status}): {body}")]
    UserInfo { status: u16, body: String },

    /// Revocation endpoint returned a non-2xx response.
    #[error("Token revocation failed: {0}")]
    Revocation(ProtocolError),

    /// Callback `state` does not match the one issued for this attempt.
    #[error("OAuth state mismatch")]
    StateMismatch,

    /// Callback arrived without an authorization code.
    #[error("Authorization code missing from callback")]
    MissingCode,

    /// No login attempt is pending for this callback.
    #[error("No pending login attempt")]
    NoPendingAttempt,

    /// Refresh needed but the token set carries no refresh token.
    #[error("No refresh token available")]
    MissingRefreshToken,

    /// The provider redirected back with an OAuth error.
    #[error("Identity provider error: {error}")]
    Provider { error: String, description: Option<String> },

    /// A provider response could not be decoded or failed validation.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Client-context storage failed.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl SsoError {
    /// Whether the failed operation may succeed if attempted again later
    /// without user interaction.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::UserInfo { status, .. } => *status != 401 && *status >= 500,
            Self::TokenRefresh(ProtocolError::Transient { .. })
            | Self::Revocation(ProtocolError::Transient { .. }) => true,
            _ => false,
        }
    }

    /// Whether the session is definitively lost and the user must log in
    /// again.
    #[must_use]
    pub fn requires_reauthentication(&self) -> bool {
        matches!(
            self,
            Self::TokenRefresh(_)
                | Self::MissingRefreshToken
                | Self::UserInfo { status: 401, .. }
                | Self::StateMismatch
                | Self::MissingCode
                | Self::NoPendingAttempt
                | Self::TokenExchange { .. }
        )
    }

    /// Stable label suitable for structured logging.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::Network(_) => "network",
            Self::TokenExchange { .. } => "token_exchange_failed",
            Self::TokenRefresh(ProtocolError::InvalidGrant { .. }) => "invalid_grant",
            Self::TokenRefresh(_) => "token_refresh_failed",
            Self::UserInfo { .. } => "userinfo_failed",
            Self::Revocation(_) => "revocation_failed",
            Self::StateMismatch | Self::NoPendingAttempt => "state_mismatch",
            Self::MissingCode => "missing_code",
            Self::MissingRefreshToken => "missing_refresh_token",
            Self::Provider { .. } => "provider_error",
            Self::InvalidResponse(_) => "invalid_response",
            Self::Storage(_) => "storage",
        }
    }
}

/// Result type alias for SSOKit operations
pub type Result<T> = std::result::Result<T, SsoError>;
