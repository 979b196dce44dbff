//! # SSOKit Core
//!
//! Protocol logic and session orchestration - no infrastructure
//! dependencies.
//!
//! This crate contains:
//! - PKCE/state generation and authorization/end-session URL builders
//! - The login attempt state machine
//! - The client-context token store and session resolver
//! - Claims normalization and role views
//! - The auth context provider and rendering gates
//! - Port interfaces (traits) for the identity provider, storage and clock
//!
//! ## Architecture Principles
//! - Only depends on `ssokit-domain`
//! - No HTTP, cookie or filesystem code
//! - All external dependencies via traits
//! - Pure, testable protocol logic

pub mod browser;
pub mod client;
pub mod context;
pub mod flow;
pub mod gates;
pub mod normalize;
pub mod pkce;
pub mod roles;
pub mod token_store;
pub mod urls;

// Port interfaces
pub mod ports;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use browser::BrowserSessionResolver;
pub use client::SsoClient;
pub use context::{AuthContextValue, AuthProvider, AuthState, ProviderConfig, ProviderOptions};
pub use flow::{
    complete_attempt, sanitize_return_to, AttemptPhase, CallbackParams, LoginAttempt, LoginFlow,
    LoginOutcome,
};
pub use gates::{Gate, GateView};
pub use normalize::{normalize_user_info, parse_user_info_body};
pub use pkce::{generate_pkce, generate_state, validate_state, verify_challenge};
pub use ports::{
    Clock, ExchangeParams, IdentityProvider, Navigator, SessionResolver, SessionStorage, SystemClock,
};
pub use roles::{has_all_roles, has_any_role, has_app_role, has_role, RoleView};
pub use token_store::{is_token_expired, is_token_expired_at, TokenStore};
pub use urls::{build_authorization_url, build_logout_url, AuthorizationParams};
