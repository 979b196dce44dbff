//! Authorization and end-session URL builders
//!
//! Pure formatters: no I/O, no randomness. Query values are
//! `application/x-www-form-urlencoded`, so spaces in the scope list become
//! `+`.

use ssokit_domain::config::join_endpoint;
use ssokit_domain::constants::{AUTHORIZE_PATH, CODE_CHALLENGE_METHOD, END_SESSION_PATH};
use url::form_urlencoded;

/// Inputs for [`build_authorization_url`].
#[derive(Debug, Clone, Copy)]
pub struct AuthorizationParams<'a> {
    pub identity_base_url: &'a str,
    pub client_id: &'a str,
    pub redirect_uri: &'a str,
    pub scopes: &'a [String],
    pub state: &'a str,
    pub code_challenge: &'a str,
}

/// Build the authorization-code redirect target.
///
/// # Examples
/// ```
/// use ssokit_core::urls::{build_authorization_url, AuthorizationParams};
///
/// let scopes = vec!["openid".to_string()];
/// let url = build_authorization_url(&AuthorizationParams {
///     identity_base_url: "https://id.example.com",
///     client_id: "abc",
///     redirect_uri: "https://app.example.com/cb",
///     scopes: &scopes,
///     state: "S1",
///     code_challenge: "C1",
/// });
/// assert!(url.starts_with("https://id.example.com/api/auth/oauth2/authorize?response_type=code"));
/// ```
#[must_use]
pub fn build_authorization_url(params: &AuthorizationParams<'_>) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("response_type", "code")
        .append_pair("client_id", params.client_id)
        .append_pair("redirect_uri", params.redirect_uri)
        .append_pair("scope", &params.scopes.join(" "))
        .append_pair("state", params.state)
        .append_pair("code_challenge", params.code_challenge)
        .append_pair("code_challenge_method", CODE_CHALLENGE_METHOD)
        .finish();

    format!("{}?{query}", join_endpoint(params.identity_base_url, AUTHORIZE_PATH))
}

/// Build the RP-initiated (end-session) logout URL.
///
/// Parameters are only included when provided.
#[must_use]
pub fn build_logout_url(
    identity_base_url: &str,
    id_token: Option<&str>,
    post_logout_redirect_uri: Option<&str>,
) -> String {
    let endpoint = join_endpoint(identity_base_url, END_SESSION_PATH);
    if id_token.is_none() && post_logout_redirect_uri.is_none() {
        return endpoint;
    }

    let mut query = form_urlencoded::Serializer::new(String::new());
    if let Some(hint) = id_token {
        query.append_pair("id_token_hint", hint);
    }
    if let Some(uri) = post_logout_redirect_uri {
        query.append_pair("post_logout_redirect_uri", uri);
    }
    format!("{endpoint}?{}", query.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorization_url_exact_string() {
        let scopes = vec!["openid".to_string(), "profile".to_string()];
        let url = build_authorization_url(&AuthorizationParams {
            identity_base_url: "https://id.example.com",
            client_id: "abc",
            redirect_uri: "https://app.example.com/callback",
            scopes: &scopes,
            state: "S1",
            code_challenge: "C1",
        });

        assert_eq!(
            url,
            "https://id.example.com/api/auth/oauth2/authorize?response_type=code&client_id=abc\
             &redirect_uri=https%3A%2F%2Fapp.example.com%2Fcallback&scope=openid+profile\
             &state=S1&code_challenge=C1&code_challenge_method=S256"
        );
    }

    #[test]
    fn authorization_url_is_deterministic() {
        let scopes = vec!["openid".to_string()];
        let params = AuthorizationParams {
            identity_base_url: "https://id.example.com/",
            client_id: "abc",
            redirect_uri: "https://app.example.com/callback",
            scopes: &scopes,
            state: "S1",
            code_challenge: "C1",
        };
        assert_eq!(build_authorization_url(&params), build_authorization_url(&params));
        assert!(build_authorization_url(&params)
            .starts_with("https://id.example.com/api/auth/oauth2/authorize?"));
    }

    #[test]
    fn logout_url_without_params() {
        assert_eq!(
            build_logout_url("https://id.example.com", None, None),
            "https://id.example.com/api/auth/oauth2/end-session"
        );
    }

    #[test]
    fn logout_url_with_hint_and_redirect() {
        assert_eq!(
            build_logout_url("https://id.example.com", Some("ey.J"), Some("https://app.example.com/")),
            "https://id.example.com/api/auth/oauth2/end-session?id_token_hint=ey.J\
             &post_logout_redirect_uri=https%3A%2F%2Fapp.example.com%2F"
        );
    }
}
