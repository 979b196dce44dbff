//! axum integration
//!
//! Cookie-backed counterpart of the client-context resolver: the Token Set
//! lives in four httpOnly cookies and every request resolves from its own
//! jar. There is no process-wide token cache.
//!
//! ```rust,ignore
//! let auth = ServerAuth::new(HttpIdentityClient::new(config)?, ServerSettings::default())?;
//! let app = Router::new()
//!     .route("/dashboard", get(dashboard))
//!     .with_state(auth.clone())
//!     .merge(auth_routes(auth.clone()))
//!     .layer(axum::middleware::from_fn_with_state(auth, refresh_session));
//! ```

pub mod cookies;
pub mod extract;
pub mod middleware;
pub mod resolver;
pub mod routes;
pub mod settings;
pub mod state;

pub use extract::{CurrentSession, RequireSession};
pub use middleware::refresh_session;
pub use resolver::ServerResolution;
pub use routes::auth_routes;
pub use settings::ServerSettings;
pub use state::ServerAuth;
