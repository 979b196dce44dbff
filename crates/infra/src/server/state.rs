use std::sync::Arc;

use ssokit_core::ports::{Clock, IdentityProvider, SystemClock};
use ssokit_domain::{Result, SsoConfig};

use super::settings::ServerSettings;

/// Shared state for the auth routes, middleware and extractors.
///
/// Holds no per-user data: every request resolves from its own cookies.
#[derive(Clone)]
pub struct ServerAuth {
    pub(super) provider: Arc<dyn IdentityProvider>,
    pub(super) settings: Arc<ServerSettings>,
    pub(super) clock: Arc<dyn Clock>,
}

impl ServerAuth {
    /// # Errors
    /// [`ssokit_domain::SsoError::Configuration`] if the provider's client
    /// configuration or `settings` is invalid.
    pub fn new(provider: impl IdentityProvider + 'static, settings: ServerSettings) -> Result<Self> {
        provider.config().validate()?;
        settings.validate()?;
        Ok(Self { provider: Arc::new(provider), settings: Arc::new(settings), clock: Arc::new(SystemClock) })
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn settings(&self) -> &ServerSettings {
        &self.settings
    }

    #[must_use]
    pub fn config(&self) -> &SsoConfig {
        self.provider.config()
    }

    #[must_use]
    pub fn provider(&self) -> &Arc<dyn IdentityProvider> {
        &self.provider
    }

    pub(super) fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }
}

impl std::fmt::Debug for ServerAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerAuth")
            .field("client_id", &self.config().client_id)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
