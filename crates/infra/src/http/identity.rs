//! Identity provider over HTTP
//!
//! Talks to the provider's token, UserInfo and revocation endpoints under
//! `identity_base_url`. Token and revocation requests are form-encoded
//! POSTs sent exactly once; the UserInfo GET goes through the client's
//! bounded retry.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Method, Response};
use ssokit_core::normalize::parse_user_info_body;
use ssokit_core::ports::{ExchangeParams, IdentityProvider};
use ssokit_domain::{
    ProtocolError, Result, SsoConfig, SsoError, TokenResponse, TokenTypeHint, UserInfoClaims,
};
use tracing::{debug, warn};

use super::client::HttpClient;
use crate::errors::InfraError;

const USER_AGENT: &str = concat!("ssokit/", env!("CARGO_PKG_VERSION"));

/// reqwest-backed [`IdentityProvider`]
#[derive(Debug, Clone)]
pub struct HttpIdentityClient {
    config: SsoConfig,
    http: HttpClient,
}

impl HttpIdentityClient {
    /// Build a client using `config.http_timeout_secs`.
    ///
    /// # Errors
    /// [`SsoError::Configuration`] if the configuration is invalid or the
    /// HTTP client cannot be built.
    pub fn new(config: SsoConfig) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .user_agent(USER_AGENT)
            .build()?;
        Self::with_http_client(config, http)
    }

    /// Build a client around an existing [`HttpClient`].
    ///
    /// # Errors
    /// [`SsoError::Configuration`] if the configuration is invalid.
    pub fn with_http_client(config: SsoConfig, http: HttpClient) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, http })
    }

    async fn post_form(&self, url: String, form: &[(&str, &str)]) -> Result<Response> {
        let request = self
            .http
            .request(Method::POST, url)
            .header(ACCEPT, "application/json")
            .form(form);
        self.http.send_once(request).await
    }
}

async fn read_body(response: Response) -> Result<String> {
    response.text().await.map_err(|e| InfraError::from(e).into())
}

fn parse_token_response(body: &str) -> Result<TokenResponse> {
    serde_json::from_str(body)
        .map_err(|e| SsoError::InvalidResponse(format!("token response: {e}")))
}

#[async_trait]
impl IdentityProvider for HttpIdentityClient {
    async fn exchange_code(&self, params: &ExchangeParams) -> Result<TokenResponse> {
        let response = self
            .post_form(
                self.config.token_endpoint(),
                &[
                    ("grant_type", "authorization_code"),
                    ("code", &params.code),
                    ("code_verifier", &params.code_verifier),
                    ("redirect_uri", &params.redirect_uri),
                    ("client_id", &self.config.client_id),
                ],
            )
            .await?;

        let status = response.status();
        let body = read_body(response).await?;
        if !status.is_success() {
            warn!(status = status.as_u16(), "authorization code exchange rejected");
            return Err(SsoError::TokenExchange { status: status.as_u16(), body });
        }

        debug!("authorization code exchanged");
        parse_token_response(&body)
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenResponse> {
        let response = self
            .post_form(
                self.config.token_endpoint(),
                &[
                    ("grant_type", "refresh_token"),
                    ("refresh_token", refresh_token),
                    ("client_id", &self.config.client_id),
                ],
            )
            .await?;

        let status = response.status();
        let body = read_body(response).await?;
        if !status.is_success() {
            let error = ProtocolError::classify(status.as_u16(), &body);
            warn!(status = status.as_u16(), error = %error, "refresh grant rejected");
            return Err(SsoError::TokenRefresh(error));
        }

        parse_token_response(&body)
    }

    async fn fetch_user_info(&self, access_token: &str) -> Result<UserInfoClaims> {
        let request = self
            .http
            .request(Method::GET, self.config.userinfo_endpoint())
            .bearer_auth(access_token)
            .header(ACCEPT, "application/json, application/jwt");
        let response = self.http.send(request).await?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        if !status.is_success() {
            let body = read_body(response).await?;
            debug!(status = status.as_u16(), "UserInfo request rejected");
            return Err(SsoError::UserInfo { status: status.as_u16(), body });
        }

        let bytes = response.bytes().await.map_err(|e| SsoError::from(InfraError::from(e)))?;
        parse_user_info_body(content_type.as_deref(), &bytes)
    }

    async fn revoke_token(&self, token: &str, hint: TokenTypeHint) -> Result<()> {
        let response = self
            .post_form(
                self.config.revoke_endpoint(),
                &[
                    ("token", token),
                    ("token_type_hint", hint.as_str()),
                    ("client_id", &self.config.client_id),
                ],
            )
            .await?;

        let status = response.status();
        if status.is_success() {
            debug!(hint = hint.as_str(), "token revoked");
            return Ok(());
        }

        let body = read_body(response).await?;
        Err(SsoError::Revocation(ProtocolError::classify(status.as_u16(), &body)))
    }

    fn config(&self) -> &SsoConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;

    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine as _;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client_for(server: &MockServer) -> HttpIdentityClient {
        let config = SsoConfig::new(server.uri(), "abc", "https://app.example.com/callback");
        let http = HttpClient::builder()
            .base_backoff(Duration::from_millis(5))
            .max_attempts(2)
            .build()
            .unwrap();
        HttpIdentityClient::with_http_client(config, http).unwrap()
    }

    fn exchange_params() -> ExchangeParams {
        ExchangeParams {
            code: "code-1".into(),
            code_verifier: "verifier-1".into(),
            redirect_uri: "https://app.example.com/callback".into(),
        }
    }

    #[test]
    fn rejects_invalid_config() {
        let err = HttpIdentityClient::new(SsoConfig::new("nope", "abc", "https://app/cb")).unwrap_err();
        assert!(matches!(err, SsoError::Configuration(_)));
    }

    #[tokio::test]
    async fn exchange_posts_pkce_form() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/oauth2/token"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=code-1"))
            .and(body_string_contains("code_verifier=verifier-1"))
            .and(body_string_contains("client_id=abc"))
            .and(body_string_contains("redirect_uri=https%3A%2F%2Fapp.example.com%2Fcallback"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "at",
                "token_type": "Bearer",
                "expires_in": 900,
                "refresh_token": "rt",
                "id_token": "idt",
                "scope": "openid"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = client_for(&server).exchange_code(&exchange_params()).await.unwrap();
        assert_eq!(response.access_token, "at");
        assert_eq!(response.expires_in, 900);
        assert_eq!(response.refresh_token.as_deref(), Some("rt"));
    }

    #[tokio::test]
    async fn exchange_failure_carries_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/oauth2/token"))
            .respond_with(ResponseTemplate::new(400).set_body_string(r#"{"error":"invalid_grant"}"#))
            .expect(1)
            .mount(&server)
            .await;

        let err = client_for(&server).exchange_code(&exchange_params()).await.unwrap_err();
        assert_eq!(
            err,
            SsoError::TokenExchange { status: 400, body: r#"{"error":"invalid_grant"}"#.into() }
        );
    }

    #[tokio::test]
    async fn refresh_invalid_grant_is_classified() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/oauth2/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=rt-1"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})))
            .expect(1)
            .mount(&server)
            .await;

        let err = client_for(&server).refresh_token("rt-1").await.unwrap_err();
        assert!(matches!(err, SsoError::TokenRefresh(ProtocolError::InvalidGrant { status: 400, .. })));
    }

    #[tokio::test]
    async fn refresh_server_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let err = client_for(&server).refresh_token("rt-1").await.unwrap_err();
        assert!(matches!(err, SsoError::TokenRefresh(ProtocolError::Transient { status: 503, .. })));
    }

    #[tokio::test]
    async fn user_info_sends_bearer_and_parses_json() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/auth/oauth2/userinfo"))
            .and(header("authorization", "Bearer at-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sub": "user-9",
                "email": "ada@example.com",
                "roles": ["admin"]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let claims = client_for(&server).fetch_user_info("at-1").await.unwrap();
        assert_eq!(claims.sub, "user-9");
        assert_eq!(claims.email.as_deref(), Some("ada@example.com"));
    }

    #[tokio::test]
    async fn user_info_accepts_jwt_body() {
        let server = MockServer::start().await;
        let payload = URL_SAFE_NO_PAD.encode(br#"{"sub":"user-jwt"}"#);
        let jwt = format!("eyJhbGciOiJub25lIn0.{payload}.");
        Mock::given(method("GET"))
            .and(path("/api/auth/oauth2/userinfo"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(jwt, "application/jwt"))
            .mount(&server)
            .await;

        let claims = client_for(&server).fetch_user_info("at-1").await.unwrap();
        assert_eq!(claims.sub, "user-jwt");
    }

    #[tokio::test]
    async fn user_info_unauthorized_keeps_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/auth/oauth2/userinfo"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let err = client_for(&server).fetch_user_info("expired").await.unwrap_err();
        assert!(matches!(err, SsoError::UserInfo { status: 401, .. }));
        assert!(err.requires_reauthentication());
    }

    #[tokio::test]
    async fn revoke_posts_token_and_hint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/oauth2/revoke"))
            .and(body_string_contains("token=rt-1"))
            .and(body_string_contains("token_type_hint=refresh_token"))
            .and(body_string_contains("client_id=abc"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server).revoke_token("rt-1", TokenTypeHint::RefreshToken).await.unwrap();
    }

    #[tokio::test]
    async fn revoke_failure_is_classified() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/oauth2/revoke"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = client_for(&server).revoke_token("at", TokenTypeHint::AccessToken).await.unwrap_err();
        assert!(matches!(err, SsoError::Revocation(ProtocolError::Transient { .. })));
    }

    #[tokio::test]
    async fn offline_provider_is_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let config = SsoConfig::new(format!("http://{addr}"), "abc", "https://app/cb");
        let client = HttpIdentityClient::with_http_client(
            config,
            HttpClient::builder().max_attempts(1).build().unwrap(),
        )
        .unwrap();

        let err = client.refresh_token("rt").await.unwrap_err();
        assert!(matches!(err, SsoError::Network(_)));
    }
}
