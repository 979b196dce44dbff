//! Authorization-code login attempts
//!
//! A [`LoginAttempt`] carries the state nonce and PKCE verifier across the
//! redirect to the identity provider. It moves through
//!
//! ```text
//! Init -> AwaitingCallback -> Exchanging -> Authenticated
//!              |                   |
//!              +-----> Failed <----+
//! ```
//!
//! `Failed` is terminal: a failed exchange is never retried, the user starts
//! a new attempt. Attempts are single-use and discarded on the first
//! callback whatever its outcome.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use ssokit_domain::constants::{LOGIN_ATTEMPT_STORAGE_KEY, LOGIN_ATTEMPT_TTL_SECS};
use ssokit_domain::{PkcePair, Result, SsoConfig, SsoError, TokenSet};
use tracing::{debug, info, warn};
use url::{form_urlencoded, Url};

use crate::pkce::{generate_pkce, generate_state, validate_state};
use crate::ports::{ExchangeParams, IdentityProvider, SessionStorage};
use crate::urls::{build_authorization_url, AuthorizationParams};

/// Lifecycle phase of one login attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptPhase {
    Init,
    AwaitingCallback,
    Exchanging,
    Authenticated,
    Failed,
}

impl AttemptPhase {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Authenticated | Self::Failed)
    }

    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Init, Self::AwaitingCallback)
                | (Self::AwaitingCallback, Self::Exchanging | Self::Failed)
                | (Self::Exchanging, Self::Authenticated | Self::Failed)
        )
    }
}

/// Query parameters delivered to the redirect URI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl CallbackParams {
    /// Extract callback parameters from a full redirect URL.
    ///
    /// # Errors
    /// Returns [`SsoError::InvalidResponse`] if `url` does not parse.
    pub fn from_url(url: &str) -> Result<Self> {
        let url = Url::parse(url)
            .map_err(|e| SsoError::InvalidResponse(format!("callback URL: {e}")))?;
        Ok(Self::from_query(url.query().unwrap_or_default()))
    }

    /// Extract callback parameters from a raw query string.
    ///
    /// A repeated `code` or `state` is ambiguous and reads as absent, so
    /// the callback fails as a missing code or a state mismatch.
    #[must_use]
    pub fn from_query(query: &str) -> Self {
        let mut params = Self::default();
        let mut repeated = Vec::new();

        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            let slot = match key.as_ref() {
                "code" => &mut params.code,
                "state" => &mut params.state,
                "error" => &mut params.error,
                "error_description" => &mut params.error_description,
                _ => continue,
            };
            if slot.is_some() {
                repeated.push(key.into_owned());
            } else {
                *slot = Some(value.into_owned());
            }
        }

        if repeated.iter().any(|k| k == "code") {
            params.code = None;
        }
        if repeated.iter().any(|k| k == "state") {
            params.state = None;
        }
        params
    }
}

/// One in-flight authorization request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginAttempt {
    pub state: String,
    pub pkce: PkcePair,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_to: Option<String>,
    /// Epoch milliseconds
    pub created_at: i64,
    pub phase: AttemptPhase,
}

impl LoginAttempt {
    /// Fresh attempt with new PKCE material and state nonce.
    ///
    /// `return_to` is dropped unless it is a same-origin path.
    #[must_use]
    pub fn new(return_to: Option<&str>, now_ms: i64) -> Self {
        Self {
            state: generate_state(),
            pkce: generate_pkce(),
            return_to: sanitize_return_to(return_to),
            created_at: now_ms,
            phase: AttemptPhase::Init,
        }
    }

    /// Authorization URL for this attempt.
    #[must_use]
    pub fn authorization_url(&self, config: &SsoConfig) -> String {
        build_authorization_url(&AuthorizationParams {
            identity_base_url: &config.identity_base_url,
            client_id: &config.client_id,
            redirect_uri: &config.redirect_uri,
            scopes: &config.scopes,
            state: &self.state,
            code_challenge: &self.pkce.code_challenge,
        })
    }

    /// Move to `next`.
    ///
    /// # Errors
    /// Returns [`SsoError::NoPendingAttempt`] if the transition is not
    /// allowed; terminal attempts can never be reused.
    pub fn transition(&mut self, next: AttemptPhase) -> Result<()> {
        if !self.phase.can_transition_to(next) {
            debug!(from = ?self.phase, to = ?next, "rejected login attempt transition");
            return Err(SsoError::NoPendingAttempt);
        }
        self.phase = next;
        Ok(())
    }

    /// Record that the user was sent to the provider.
    pub fn mark_redirected(&mut self) {
        if self.phase == AttemptPhase::Init {
            self.phase = AttemptPhase::AwaitingCallback;
        }
    }

    #[must_use]
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        now_ms.saturating_sub(self.created_at) > LOGIN_ATTEMPT_TTL_SECS * 1000
    }

    /// Check a callback against this attempt and return its code.
    ///
    /// Order: provider-reported error, then state, then code. The state is
    /// checked before the code is ever looked at.
    ///
    /// # Errors
    /// [`SsoError::Provider`], [`SsoError::StateMismatch`] or
    /// [`SsoError::MissingCode`].
    pub fn verify_callback<'a>(&self, params: &'a CallbackParams) -> Result<&'a str> {
        if let Some(error) = &params.error {
            return Err(SsoError::Provider {
                error: error.clone(),
                description: params.error_description.clone(),
            });
        }

        match params.state.as_deref() {
            Some(state) if validate_state(&self.state, state) => {}
            _ => return Err(SsoError::StateMismatch),
        }

        params.code.as_deref().filter(|code| !code.is_empty()).ok_or(SsoError::MissingCode)
    }
}

/// Keep `return_to` only if it is a same-origin absolute path.
///
/// Rejects absolute URLs, protocol-relative `//host` forms, backslash
/// tricks and control characters.
#[must_use]
pub fn sanitize_return_to(return_to: Option<&str>) -> Option<String> {
    let path = return_to?.trim();
    let same_origin = path.starts_with('/')
        && !path.starts_with("//")
        && !path.starts_with("/\\")
        && !path.chars().any(|c| c.is_control() || c == '\\');
    same_origin.then(|| path.to_string())
}

/// Successful callback result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOutcome {
    pub tokens: TokenSet,
    pub return_to: Option<String>,
}

/// Client-context login flow
///
/// Persists the pending attempt in tab storage so it survives the full-page
/// redirect, with an in-memory copy for when storage is unavailable.
pub struct LoginFlow<S: SessionStorage> {
    storage: S,
    pending: Mutex<Option<LoginAttempt>>,
}

impl<S: SessionStorage> LoginFlow<S> {
    #[must_use]
    pub fn new(storage: S) -> Self {
        Self { storage, pending: Mutex::new(None) }
    }

    /// Start a new attempt and return the authorization URL to navigate to.
    ///
    /// Any previous pending attempt is replaced.
    #[must_use]
    pub fn begin(&self, config: &SsoConfig, return_to: Option<&str>, now_ms: i64) -> String {
        let mut attempt = LoginAttempt::new(return_to, now_ms);
        let url = attempt.authorization_url(config);
        attempt.mark_redirected();

        match serde_json::to_string(&attempt) {
            Ok(json) => {
                if let Err(e) = self.storage.set_item(LOGIN_ATTEMPT_STORAGE_KEY, &json) {
                    warn!(error = %e, "login attempt storage write failed; keeping it in memory only");
                }
            }
            Err(e) => warn!(error = %e, "failed to serialize login attempt"),
        }
        *self.pending.lock() = Some(attempt);

        debug!("login attempt started");
        url
    }

    /// The pending attempt, if any, without consuming it.
    #[must_use]
    pub fn pending_attempt(&self) -> Option<LoginAttempt> {
        if let Some(attempt) = self.pending.lock().clone() {
            return Some(attempt);
        }
        self.storage
            .get_item(LOGIN_ATTEMPT_STORAGE_KEY)
            .ok()
            .flatten()
            .and_then(|raw| serde_json::from_str(&raw).ok())
    }

    /// Remove the pending attempt from memory and storage.
    pub fn cancel(&self) {
        let _ = self.take_attempt();
    }

    fn take_attempt(&self) -> Option<LoginAttempt> {
        let attempt = self.pending_attempt();
        *self.pending.lock() = None;
        if let Err(e) = self.storage.remove_item(LOGIN_ATTEMPT_STORAGE_KEY) {
            warn!(error = %e, "login attempt storage delete failed");
        }
        attempt
    }

    /// Verify the callback and exchange the code.
    ///
    /// The pending attempt is consumed before anything else happens, so a
    /// replayed callback finds nothing to complete.
    ///
    /// # Errors
    /// [`SsoError::NoPendingAttempt`] if nothing is pending (or it expired),
    /// any error from [`LoginAttempt::verify_callback`], or the exchange
    /// error.
    pub async fn complete<P>(
        &self,
        provider: &P,
        params: &CallbackParams,
        now_ms: i64,
    ) -> Result<LoginOutcome>
    where
        P: IdentityProvider + ?Sized,
    {
        let attempt = self.take_attempt().ok_or(SsoError::NoPendingAttempt)?;
        complete_attempt(attempt, provider, params, now_ms).await
    }
}

/// Verify a callback against `attempt` and exchange its code.
///
/// Shared by the client-context flow and the server callback handler; the
/// caller is responsible for having removed `attempt` from wherever it was
/// kept.
///
/// # Errors
/// [`SsoError::NoPendingAttempt`] if the attempt expired or is not awaiting
/// a callback, any error from [`LoginAttempt::verify_callback`], or the
/// exchange error.
pub async fn complete_attempt<P>(
    mut attempt: LoginAttempt,
    provider: &P,
    params: &CallbackParams,
    now_ms: i64,
) -> Result<LoginOutcome>
where
    P: IdentityProvider + ?Sized,
{
    if attempt.is_expired_at(now_ms) {
        warn!("login attempt expired before callback");
        return Err(SsoError::NoPendingAttempt);
    }

    let code = match attempt.verify_callback(params) {
        Ok(code) => code,
        Err(e) => {
            attempt.transition(AttemptPhase::Failed)?;
            warn!(error = %e, label = e.label(), "rejected login callback");
            return Err(e);
        }
    };

    attempt.transition(AttemptPhase::Exchanging)?;
    let exchange = ExchangeParams {
        code: code.to_string(),
        code_verifier: attempt.pkce.code_verifier.clone(),
        redirect_uri: provider.config().redirect_uri.clone(),
    };

    match provider.exchange_code(&exchange).await {
        Ok(response) => {
            attempt.transition(AttemptPhase::Authenticated)?;
            info!("login completed");
            Ok(LoginOutcome {
                tokens: TokenSet::from_response(response, now_ms),
                return_to: attempt.return_to,
            })
        }
        Err(e) => {
            attempt.transition(AttemptPhase::Failed)?;
            warn!(error = %e, label = e.label(), "authorization code exchange failed");
            Err(e)
        }
    }
}
