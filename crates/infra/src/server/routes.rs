//! Login, callback, logout and session routes
//!
//! Every failure ends in a redirect: none of these handlers renders an
//! error page or a 5xx.

use axum::extract::{RawQuery, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Json, Router};
use axum_extra::extract::CookieJar;
use ssokit_core::{build_logout_url, complete_attempt, normalize_user_info, CallbackParams, LoginAttempt};
use ssokit_domain::constants::RETURN_TO_PARAM;
use ssokit_domain::{Session, SsoError, TokenTypeHint};
use tracing::{info, warn};
use url::form_urlencoded;

use super::cookies;
use super::resolver::ServerResolution;
use super::state::ServerAuth;

/// Auth router mounted under `settings.auth_path`.
///
/// - `GET  {auth_path}/login?returnTo=/path`
/// - `GET  {auth_path}/callback`
/// - `GET|POST {auth_path}/logout`
/// - `GET  {auth_path}/session`
pub fn auth_routes(auth: ServerAuth) -> Router {
    let settings = auth.settings();

    Router::new()
        .route(&settings.route("login"), get(login))
        .route(&settings.route("callback"), get(callback))
        .route(&settings.route("logout"), get(logout).post(logout))
        .route(&settings.route("session"), get(session))
        .with_state(auth)
}

// ── Login ──────────────────────────────────────────────────────────

/// First `returnTo` value in the query, if any.
fn return_to_param(query: Option<&str>) -> Option<String> {
    form_urlencoded::parse(query.unwrap_or_default().as_bytes())
        .find(|(key, _)| key == RETURN_TO_PARAM)
        .map(|(_, value)| value.into_owned())
}

async fn login(State(auth): State<ServerAuth>, jar: CookieJar, RawQuery(query): RawQuery) -> Response {
    let return_to = return_to_param(query.as_deref());
    let mut attempt = LoginAttempt::new(return_to.as_deref(), auth.now_ms());
    let url = attempt.authorization_url(auth.config());
    attempt.mark_redirected();

    match cookies::attempt_cookie(auth.settings(), &attempt) {
        Ok(cookie) => (jar.add(cookie), Redirect::to(&url)).into_response(),
        Err(e) => {
            warn!(error = %e, "could not start login");
            Redirect::to(&auth.settings().error_url("login_failed")).into_response()
        }
    }
}

// ── Callback ───────────────────────────────────────────────────────

async fn callback(
    State(auth): State<ServerAuth>,
    jar: CookieJar,
    RawQuery(query): RawQuery,
) -> Response {
    let settings = auth.settings();
    let params = CallbackParams::from_query(query.as_deref().unwrap_or_default());

    let result = match cookies::read_attempt(&jar, settings) {
        Some(attempt) => complete_attempt(attempt, auth.provider().as_ref(), &params, auth.now_ms()).await,
        None => Err(match &params.error {
            Some(error) => SsoError::Provider {
                error: error.clone(),
                description: params.error_description.clone(),
            },
            None => {
                warn!("OAuth callback without a pending login attempt");
                SsoError::NoPendingAttempt
            }
        }),
    };

    match result {
        Ok(outcome) => {
            let jar = cookies::with_session(jar, settings, &outcome.tokens)
                .add(cookies::clear_attempt_cookie(settings));
            let target = outcome.return_to.unwrap_or_else(|| settings.login_redirect.clone());
            info!("server login successful");
            (jar, Redirect::to(&target)).into_response()
        }
        // No session cookies on failure; the attempt is spent either way
        Err(e) => {
            let jar = jar.add(cookies::clear_attempt_cookie(settings));
            (jar, Redirect::to(&settings.error_url(error_code(&e)))).into_response()
        }
    }
}

/// Error code placed on the error redirect.
fn error_code(error: &SsoError) -> &str {
    match error {
        SsoError::Provider { error, .. } => error,
        other => other.label(),
    }
}

// ── Logout ─────────────────────────────────────────────────────────

async fn logout(State(auth): State<ServerAuth>, jar: CookieJar) -> Response {
    let settings = auth.settings();
    let tokens = cookies::read_tokens(&jar, settings);

    if let Some(tokens) = &tokens {
        let (token, hint) = match &tokens.refresh_token {
            Some(refresh) => (refresh.as_str(), TokenTypeHint::RefreshToken),
            None => (tokens.access_token.as_str(), TokenTypeHint::AccessToken),
        };
        if let Err(e) = auth.provider().revoke_token(token, hint).await {
            warn!(error = %e, "token revocation failed during logout");
        }
    }

    let target = if settings.rp_initiated_logout {
        let config = auth.config();
        build_logout_url(
            &config.identity_base_url,
            tokens.as_ref().and_then(|t| t.id_token.as_deref()),
            config.post_logout_redirect_uri.as_deref(),
        )
    } else {
        settings.logout_redirect.clone()
    };

    info!("server logout");
    (cookies::without_session(jar, settings), Redirect::to(&target)).into_response()
}

// ── Session ────────────────────────────────────────────────────────

/// Resolved session as JSON (`null` when signed out).
///
/// Unlike a render path this handler owns its response, so an expiring
/// session is refreshed here and the new cookies are set.
async fn session(State(auth): State<ServerAuth>, jar: CookieJar) -> Response {
    match auth.resolve(&jar).await {
        ServerResolution::Authenticated(session) => Json(Some(session)).into_response(),
        ServerResolution::Unauthenticated => Json(None::<Session>).into_response(),
        ServerResolution::NeedsRefresh => {
            let settings = auth.settings();
            let Some(current) = cookies::read_tokens(&jar, settings) else {
                return Json(None::<Session>).into_response();
            };

            let tokens = match auth.refresh_tokens(&current).await {
                Ok(tokens) => tokens,
                Err(_) => {
                    return (cookies::without_session(jar, settings), Json(None::<Session>)).into_response();
                }
            };

            let session = auth
                .provider()
                .fetch_user_info(&tokens.access_token)
                .await
                .ok()
                .map(|claims| normalize_user_info(&claims, tokens.expires_at));
            (cookies::with_session(jar, settings, &tokens), Json(session)).into_response()
        }
    }
}
