//! # SSOKit Domain
//!
//! Domain types and models for the SSOKit single-sign-on client core.
//!
//! This crate contains:
//! - Token, session and user data types
//! - The OIDC UserInfo claims schema and its defaulting rules
//! - The error taxonomy and `Result` alias
//! - Client configuration structures
//! - Protocol constants (endpoint paths, default scopes, buffers)
//!
//! ## Architecture
//! - No dependencies on other SSOKit crates
//! - No I/O: everything here is plain data plus pure helpers

pub mod claims;
pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use claims::{RoleList, UserInfoClaims};
pub use config::{ConfigOverrides, SsoConfig};
pub use errors::{OAuthErrorResponse, ProtocolError, Result, SsoError};
pub use types::{AppRoles, PkcePair, Session, TokenResponse, TokenSet, TokenTypeHint, User};
