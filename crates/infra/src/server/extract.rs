//! Session extractors
//!
//! Both read [`ServerAuth`] from the router state through `FromRef`, so they
//! work in any app whose state can hand one out.
//!
//! ```rust,ignore
//! async fn dashboard(RequireSession(session): RequireSession) -> String {
//!     format!("hello {}", session.user.user_id)
//! }
//!
//! async fn home(CurrentSession(session): CurrentSession) -> String {
//!     session.map_or("guest".into(), |s| s.user.user_id)
//! }
//! ```

use std::convert::Infallible;

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum::response::Redirect;
use axum_extra::extract::CookieJar;
use ssokit_domain::Session;

use super::middleware::RefreshedTokens;
use super::state::ServerAuth;

/// Signed-in session; rejects with a redirect to the login route that
/// carries the request's path and query as `returnTo`.
#[derive(Debug, Clone)]
pub struct RequireSession(pub Session);

impl<S> FromRequestParts<S> for RequireSession
where
    ServerAuth: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = ServerAuth::from_ref(state);
        let return_to = parts.uri.path_and_query().map_or("/", |pq| pq.as_str());

        match session_from_parts(&auth, parts).await {
            Some(session) => Ok(Self(session)),
            None => Err(Redirect::to(&auth.login_redirect_for(return_to))),
        }
    }
}

/// Optional session; never rejects.
#[derive(Debug, Clone)]
pub struct CurrentSession(pub Option<Session>);

impl<S> FromRequestParts<S> for CurrentSession
where
    ServerAuth: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = ServerAuth::from_ref(state);
        Ok(Self(session_from_parts(&auth, parts).await))
    }
}

async fn session_from_parts(auth: &ServerAuth, parts: &Parts) -> Option<Session> {
    if let Some(RefreshedTokens(tokens)) = parts.extensions.get::<RefreshedTokens>() {
        return auth.session_for(tokens).await;
    }
    auth.get_server_session(&CookieJar::from_headers(&parts.headers)).await
}
