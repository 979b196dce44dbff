//! Protocol constants
//!
//! Centralized location for endpoint paths, defaults and storage keys shared
//! by the client-context and server-side resolvers.

// Identity provider endpoints (relative to `identity_base_url`)
pub const AUTHORIZE_PATH: &str = "/api/auth/oauth2/authorize";
pub const TOKEN_PATH: &str = "/api/auth/oauth2/token";
pub const USERINFO_PATH: &str = "/api/auth/oauth2/userinfo";
pub const REVOKE_PATH: &str = "/api/auth/oauth2/revoke";
pub const END_SESSION_PATH: &str = "/api/auth/oauth2/end-session";

// Token lifecycle
pub const DEFAULT_REFRESH_BUFFER_MS: i64 = 30_000;
pub const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

// Claims defaults
pub const DEFAULT_ROLE: &str = "user";
pub const DEFAULT_SCOPES: [&str; 4] = ["openid", "profile", "email", "offline_access"];

// PKCE
pub const CODE_CHALLENGE_METHOD: &str = "S256";
pub const CODE_VERIFIER_BYTES: usize = 32;
pub const STATE_BYTES: usize = 16;

// Client-context storage keys
pub const TOKEN_STORAGE_KEY: &str = "ssokit.tokens";
pub const LOGIN_ATTEMPT_STORAGE_KEY: &str = "ssokit.login_attempt";

// Login attempts
pub const LOGIN_ATTEMPT_TTL_SECS: i64 = 600;
pub const RETURN_TO_PARAM: &str = "returnTo";

// Default application-side routes
pub const DEFAULT_AUTH_PATH: &str = "/api/auth";
pub const DEFAULT_LOGIN_URL: &str = "/api/auth/login";
