//! Cookie refresh layer
//!
//! Install with
//! `axum::middleware::from_fn_with_state(auth.clone(), refresh_session)`.
//! For a request whose access token is inside the refresh buffer and that
//! carries a refresh token it runs check → refresh → Set-Cookie:
//!
//! - `GET`/`HEAD`: `303` back to the same URI so the retried request
//!   carries the new cookies. If the new set is already inside the buffer
//!   (very short lifetimes, clock skew) the request is forwarded instead,
//!   so a retry never triggers a second refresh.
//! - Other methods: the request is forwarded with its `Cookie` header
//!   rewritten, and the new cookies ride on the downstream response.
//!
//! A failed refresh removes all four cookies and the request continues
//! unauthenticated.

use axum::extract::{Request, State};
use axum::http::header::COOKIE;
use axum::http::{HeaderValue, Method};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::CookieJar;
use ssokit_domain::TokenSet;
use tracing::{debug, warn};

use super::cookies;
use super::settings::ServerSettings;
use super::state::ServerAuth;

/// Token Set issued by the refresh layer for the current request.
///
/// The session extractors trust it without re-applying the refresh
/// buffer, so a short-lived set still authenticates the request it was
/// issued for.
#[derive(Debug, Clone)]
pub(crate) struct RefreshedTokens(pub(crate) TokenSet);

pub async fn refresh_session(State(auth): State<ServerAuth>, mut request: Request, next: Next) -> Response {
    let settings = auth.settings();
    let jar = CookieJar::from_headers(request.headers());

    let Some(tokens) = cookies::read_tokens(&jar, settings) else {
        return next.run(request).await;
    };
    if tokens.refresh_token.is_none()
        || !tokens.is_expired_at(auth.now_ms(), auth.config().refresh_buffer_ms)
    {
        return next.run(request).await;
    }

    match auth.refresh_tokens(&tokens).await {
        Ok(next_tokens) => {
            let set_cookies = cookies::with_session(CookieJar::new(), settings, &next_tokens);

            // A set that is already due again would only redirect back here
            let due_again = next_tokens.is_expired_at(auth.now_ms(), auth.config().refresh_buffer_ms);
            if !due_again && matches!(*request.method(), Method::GET | Method::HEAD) {
                let target = request.uri().path_and_query().map_or("/", |pq| pq.as_str()).to_string();
                debug!("session refreshed; redirecting to retry with new cookies");
                return (set_cookies, Redirect::to(&target)).into_response();
            }

            rewrite_cookie_header(&mut request, &jar, settings, Some(&next_tokens));
            request.extensions_mut().insert(RefreshedTokens(next_tokens));
            let response = next.run(request).await;
            (set_cookies, response).into_response()
        }
        Err(_) => {
            rewrite_cookie_header(&mut request, &jar, settings, None);
            let response = next.run(request).await;
            (cookies::without_session(CookieJar::new(), settings), response).into_response()
        }
    }
}

/// Replace the request's session cookies with `tokens` (or drop them).
fn rewrite_cookie_header(
    request: &mut Request,
    jar: &CookieJar,
    settings: &ServerSettings,
    tokens: Option<&TokenSet>,
) {
    let session_names = [
        settings.access_cookie(),
        settings.refresh_cookie(),
        settings.id_cookie(),
        settings.expires_cookie(),
    ];

    let mut pairs: Vec<String> = jar
        .iter()
        .filter(|c| !session_names.iter().any(|name| name == c.name()))
        .map(|c| c.stripped().encoded().to_string())
        .collect();

    if let Some(tokens) = tokens {
        pairs.extend(
            cookies::session_cookies(settings, tokens)
                .iter()
                .filter(|c| c.max_age().map_or(true, |age| !age.is_zero()))
                .map(|c| c.stripped().encoded().to_string()),
        );
    }

    let headers = request.headers_mut();
    headers.remove(COOKIE);
    if pairs.is_empty() {
        return;
    }
    match HeaderValue::from_str(&pairs.join("; ")) {
        Ok(value) => {
            headers.insert(COOKIE, value);
        }
        Err(e) => warn!(error = %e, "could not rebuild Cookie header; request continues without cookies"),
    }
}
