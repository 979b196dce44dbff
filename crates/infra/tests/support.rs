//! Shared helpers for the server integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::extract::Request;
use axum::http::header::{COOKIE, LOCATION, SET_COOKIE};
use axum::middleware::from_fn_with_state;
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use axum_extra::extract::cookie::Cookie;
use axum_extra::extract::CookieJar;
use http_body_util::BodyExt;
use ssokit_core::testing::{MockClock, MockIdentityProvider};
use ssokit_infra::{auth_routes, refresh_session, CurrentSession, RequireSession, ServerAuth, ServerSettings};

pub const NOW: i64 = 1_700_000_000_000;

pub struct TestApp {
    pub router: Router,
    pub provider: Arc<MockIdentityProvider>,
    pub clock: Arc<MockClock>,
}

async fn dashboard(RequireSession(session): RequireSession) -> String {
    format!("hello {}", session.user.user_id)
}

async fn home(CurrentSession(session): CurrentSession) -> String {
    session.map_or_else(|| "guest".to_string(), |s| s.user.user_id)
}

/// Echoes the access token the handler sees.
async fn echo_token(jar: CookieJar) -> String {
    jar.get("sso_access_token").map(|c| c.value().to_string()).unwrap_or_default()
}

pub fn app_with(provider: MockIdentityProvider, settings: ServerSettings) -> TestApp {
    let provider = Arc::new(provider);
    let clock = Arc::new(MockClock::new(NOW));
    let auth = ServerAuth::new(Arc::clone(&provider), settings)
        .expect("valid settings")
        .with_clock(clock.clone());

    let router = Router::new()
        .route("/", get(home))
        .route("/dashboard", get(dashboard))
        .route("/api/echo", post(echo_token))
        .with_state(auth.clone())
        .merge(auth_routes(auth.clone()))
        .layer(from_fn_with_state(auth, refresh_session));

    TestApp { router, provider, clock }
}

pub fn app(provider: MockIdentityProvider) -> TestApp {
    app_with(provider, ServerSettings::default())
}

pub fn get_request(uri: &str, cookies: &[(&str, &str)]) -> Request {
    request("GET", uri, cookies)
}

pub fn request(method: &str, uri: &str, cookies: &[(&str, &str)]) -> Request {
    let mut builder = Request::builder().method(method).uri(uri);
    if !cookies.is_empty() {
        let header = cookies.iter().map(|(k, v)| format!("{k}={v}")).collect::<Vec<_>>().join("; ");
        builder = builder.header(COOKIE, header);
    }
    builder.body(Body::empty()).expect("request")
}

/// Session cookies for a token expiring `expires_in_ms` after [`NOW`].
pub fn session_cookie_values(expires_in_ms: i64) -> Vec<(&'static str, String)> {
    vec![
        ("sso_access_token", "at-1".to_string()),
        ("sso_refresh_token", "rt-1".to_string()),
        ("sso_id_token", "idt-1".to_string()),
        ("sso_expires_at", (NOW + expires_in_ms).to_string()),
    ]
}

pub fn as_pairs<'a>(values: &'a [(&'static str, String)]) -> Vec<(&'static str, &'a str)> {
    values.iter().map(|(k, v)| (*k, v.as_str())).collect()
}

pub fn location(response: &Response) -> String {
    response
        .headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

pub fn set_cookies(response: &Response) -> Vec<Cookie<'static>> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| Cookie::parse(v.to_string()).ok())
        .collect()
}

pub fn find_cookie(cookies: &[Cookie<'static>], name: &str) -> Option<Cookie<'static>> {
    cookies.iter().find(|c| c.name() == name).cloned()
}

pub async fn body_string(response: Response) -> String {
    let bytes = response.into_body().collect().await.expect("body").to_bytes();
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}
