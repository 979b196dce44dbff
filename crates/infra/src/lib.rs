//! # SSOKit Infrastructure
//!
//! Infrastructure implementations of the core ports.
//!
//! This crate contains:
//! - The reqwest-backed identity provider client
//! - Session storage backends (memory, JSON file)
//! - The configuration loader (env, `.env`, TOML/JSON files)
//! - Tracing subscriber setup
//! - The axum server integration (cookies, callback/login/logout routes,
//!   refresh middleware, extractors)
//!
//! ## Architecture
//! - Implements traits defined in `ssokit-core`
//! - Contains all "impure" code (network, filesystem, HTTP server)

pub mod config;
pub mod errors;
pub mod http;
pub mod server;
pub mod storage;
pub mod telemetry;

// Re-export commonly used items
pub use config::AppConfig;
pub use errors::InfraError;
pub use http::{HttpClient, HttpClientBuilder, HttpIdentityClient};
pub use server::{auth_routes, refresh_session, CurrentSession, RequireSession, ServerAuth, ServerSettings};
pub use storage::{FileSessionStorage, MemorySessionStorage};
pub use telemetry::{init_tracing, LogFormat};
