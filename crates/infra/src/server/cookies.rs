//! Session and login-attempt cookies
//!
//! The Token Set travels as four httpOnly cookies sharing one `Max-Age`.
//! The pending login attempt (state, PKCE verifier, return path) is a fifth,
//! short-lived cookie scoped to the auth routes.

use axum_extra::extract::cookie::{Cookie, SameSite};
use axum_extra::extract::CookieJar;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use ssokit_core::LoginAttempt;
use ssokit_domain::constants::LOGIN_ATTEMPT_TTL_SECS;
use ssokit_domain::{Result, SsoError, TokenSet};
use time::Duration;
use tracing::debug;

use super::settings::ServerSettings;

fn session_cookie(settings: &ServerSettings, name: String, value: String) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(settings.secure_cookies)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(Duration::days(settings.cookie_max_age_days))
        .build()
}

fn removal_cookie(name: String, path: String) -> Cookie<'static> {
    Cookie::build((name, "")).path(path).max_age(Duration::ZERO).build()
}

/// The four session cookies for `tokens`.
///
/// Absent refresh/id tokens produce removal cookies so a previous session's
/// values never linger next to a new access token.
#[must_use]
pub fn session_cookies(settings: &ServerSettings, tokens: &TokenSet) -> [Cookie<'static>; 4] {
    let optional = |name: String, value: Option<&String>| match value {
        Some(value) => session_cookie(settings, name, value.clone()),
        None => removal_cookie(name, "/".to_string()),
    };

    [
        session_cookie(settings, settings.access_cookie(), tokens.access_token.clone()),
        optional(settings.refresh_cookie(), tokens.refresh_token.as_ref()),
        optional(settings.id_cookie(), tokens.id_token.as_ref()),
        session_cookie(settings, settings.expires_cookie(), tokens.expires_at.to_string()),
    ]
}

/// Removal cookies for all four session cookies.
#[must_use]
pub fn clear_session_cookies(settings: &ServerSettings) -> [Cookie<'static>; 4] {
    [
        removal_cookie(settings.access_cookie(), "/".to_string()),
        removal_cookie(settings.refresh_cookie(), "/".to_string()),
        removal_cookie(settings.id_cookie(), "/".to_string()),
        removal_cookie(settings.expires_cookie(), "/".to_string()),
    ]
}

/// `jar` with the session cookies for `tokens` added.
#[must_use]
pub fn with_session(jar: CookieJar, settings: &ServerSettings, tokens: &TokenSet) -> CookieJar {
    session_cookies(settings, tokens).into_iter().fold(jar, CookieJar::add)
}

/// `jar` with every session cookie removed.
#[must_use]
pub fn without_session(jar: CookieJar, settings: &ServerSettings) -> CookieJar {
    clear_session_cookies(settings).into_iter().fold(jar, CookieJar::add)
}

/// Token Set carried by the request, if it has an access token.
///
/// A missing or unparsable expiry cookie reads as already expired.
#[must_use]
pub fn read_tokens(jar: &CookieJar, settings: &ServerSettings) -> Option<TokenSet> {
    let non_empty = |name: String| {
        jar.get(&name).map(|c| c.value().to_string()).filter(|v| !v.is_empty())
    };

    let access_token = non_empty(settings.access_cookie())?;
    let expires_at = non_empty(settings.expires_cookie())
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(0);

    Some(TokenSet {
        access_token,
        expires_at,
        refresh_token: non_empty(settings.refresh_cookie()),
        id_token: non_empty(settings.id_cookie()),
    })
}

/// Attempt cookie holding `attempt` as base64url JSON.
///
/// # Errors
/// [`SsoError::InvalidResponse`] if the attempt cannot be serialized.
pub fn attempt_cookie(settings: &ServerSettings, attempt: &LoginAttempt) -> Result<Cookie<'static>> {
    let json = serde_json::to_vec(attempt)
        .map_err(|e| SsoError::InvalidResponse(format!("login attempt: {e}")))?;

    Ok(Cookie::build((settings.attempt_cookie(), URL_SAFE_NO_PAD.encode(json)))
        .http_only(true)
        .secure(settings.secure_cookies)
        .same_site(SameSite::Lax)
        .path(settings.auth_path.clone())
        .max_age(Duration::seconds(LOGIN_ATTEMPT_TTL_SECS))
        .build())
}

#[must_use]
pub fn clear_attempt_cookie(settings: &ServerSettings) -> Cookie<'static> {
    removal_cookie(settings.attempt_cookie(), settings.auth_path.clone())
}

/// Pending attempt carried by the request; undecodable values read as none.
#[must_use]
pub fn read_attempt(jar: &CookieJar, settings: &ServerSettings) -> Option<LoginAttempt> {
    let raw = jar.get(&settings.attempt_cookie())?;
    let decoded = URL_SAFE_NO_PAD
        .decode(raw.value())
        .ok()
        .and_then(|bytes| serde_json::from_slice::<LoginAttempt>(&bytes).ok());
    if decoded.is_none() {
        debug!("ignoring undecodable login attempt cookie");
    }
    decoded
}
