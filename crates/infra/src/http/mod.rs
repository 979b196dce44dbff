//! HTTP adapters
//!
//! [`HttpClient`] is the shared reqwest wrapper with timeout and bounded
//! retry; [`HttpIdentityClient`] implements the identity provider port on
//! top of it.

pub mod client;
pub mod identity;

pub use client::{HttpClient, HttpClientBuilder};
pub use identity::HttpIdentityClient;
