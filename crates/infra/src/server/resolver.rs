//! Server-side session resolution
//!
//! Mirrors the client-context resolver over request cookies. A read path
//! cannot rewrite response cookies, so an expiring token yields
//! [`ServerResolution::NeedsRefresh`] instead of refreshing in place; the
//! [`refresh_session`](super::middleware::refresh_session) layer performs
//! the actual rotation.

use axum::response::Redirect;
use axum_extra::extract::CookieJar;
use ssokit_core::gates::login_url;
use ssokit_core::normalize_user_info;
use ssokit_domain::{Result, Session, SsoError, TokenSet};
use tracing::{debug, info, warn};

use super::cookies::read_tokens;
use super::state::ServerAuth;

/// Outcome of resolving one request's cookies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerResolution {
    Authenticated(Session),
    /// Access token inside the refresh buffer and a refresh token present
    NeedsRefresh,
    Unauthenticated,
}

impl ServerResolution {
    #[must_use]
    pub fn into_session(self) -> Option<Session> {
        match self {
            Self::Authenticated(session) => Some(session),
            Self::NeedsRefresh | Self::Unauthenticated => None,
        }
    }
}

impl ServerAuth {
    /// Resolve the session carried by `jar`.
    ///
    /// Any UserInfo failure reads as unauthenticated; cookies are left
    /// alone because this path cannot write them.
    pub async fn resolve(&self, jar: &CookieJar) -> ServerResolution {
        let Some(tokens) = read_tokens(jar, &self.settings) else {
            return ServerResolution::Unauthenticated;
        };

        if tokens.is_expired_at(self.now_ms(), self.config().refresh_buffer_ms) {
            return if tokens.refresh_token.is_some() {
                debug!("server session needs refresh");
                ServerResolution::NeedsRefresh
            } else {
                debug!("server session expired without refresh token");
                ServerResolution::Unauthenticated
            };
        }

        match self.provider.fetch_user_info(&tokens.access_token).await {
            Ok(claims) => ServerResolution::Authenticated(normalize_user_info(&claims, tokens.expires_at)),
            Err(e) => {
                debug!(error = %e, label = e.label(), "server session resolution failed");
                ServerResolution::Unauthenticated
            }
        }
    }

    /// Session for a Token Set the provider just issued.
    pub(super) async fn session_for(&self, tokens: &TokenSet) -> Option<Session> {
        match self.provider.fetch_user_info(&tokens.access_token).await {
            Ok(claims) => Some(normalize_user_info(&claims, tokens.expires_at)),
            Err(e) => {
                debug!(error = %e, label = e.label(), "refreshed session resolution failed");
                None
            }
        }
    }

    /// The current session, or `None`.
    pub async fn get_server_session(&self, jar: &CookieJar) -> Option<Session> {
        self.resolve(jar).await.into_session()
    }

    /// The current session, or a redirect to the login route carrying
    /// `return_to`.
    ///
    /// # Errors
    /// Never fails in the error sense: the `Err` arm is the redirect to
    /// send back.
    pub async fn require_server_session(&self, jar: &CookieJar, return_to: &str) -> std::result::Result<Session, Redirect> {
        match self.get_server_session(jar).await {
            Some(session) => Ok(session),
            None => Err(Redirect::to(&self.login_redirect_for(return_to))),
        }
    }

    /// Login route URL carrying `return_to`.
    #[must_use]
    pub fn login_redirect_for(&self, return_to: &str) -> String {
        login_url(&self.settings.login_path, return_to)
    }

    /// Run the refresh grant for `tokens`.
    ///
    /// # Errors
    /// [`SsoError::MissingRefreshToken`] without a refresh token, otherwise
    /// the provider's refresh error. Callers must drop the session on any
    /// error.
    pub async fn refresh_tokens(&self, tokens: &TokenSet) -> Result<TokenSet> {
        let refresh_token = tokens.refresh_token.as_deref().ok_or(SsoError::MissingRefreshToken)?;
        match self.provider.refresh_token(refresh_token).await {
            Ok(response) => {
                info!("server session refreshed");
                Ok(TokenSet::rotate(tokens, response, self.now_ms()))
            }
            Err(e) => {
                warn!(error = %e, label = e.label(), "server session refresh failed");
                Err(e)
            }
        }
    }
}
