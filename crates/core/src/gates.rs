//! Conditional-rendering gates
//!
//! Gates read an [`AuthContextValue`] only. [`Gate::render`] is pure; the
//! redirect-to-login side effect lives in [`Gate::effect`] so bindings run
//! it after rendering, never during.

use ssokit_domain::constants::RETURN_TO_PARAM;
use url::form_urlencoded;

use crate::context::AuthContextValue;
use crate::ports::Navigator;
use crate::roles::RoleView;

/// What a gate renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateView {
    Children,
    Fallback,
    Loading,
}

/// Gate kinds. `redirect` overrides the provider's `auto_redirect`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gate {
    SignedIn,
    SignedOut,
    RequireAuth { redirect: Option<bool> },
    RequireRole { role: String, redirect: Option<bool> },
    RequireAppRole { app_id: String, role: String, redirect: Option<bool> },
}

impl Gate {
    #[must_use]
    pub fn require_auth() -> Self {
        Self::RequireAuth { redirect: None }
    }

    #[must_use]
    pub fn require_role(role: impl Into<String>) -> Self {
        Self::RequireRole { role: role.into(), redirect: None }
    }

    #[must_use]
    pub fn require_app_role(app_id: impl Into<String>, role: impl Into<String>) -> Self {
        Self::RequireAppRole { app_id: app_id.into(), role: role.into(), redirect: None }
    }

    /// Override the provider's `auto_redirect` for this gate.
    #[must_use]
    pub fn with_redirect(self, enabled: bool) -> Self {
        match self {
            Self::RequireAuth { .. } => Self::RequireAuth { redirect: Some(enabled) },
            Self::RequireRole { role, .. } => Self::RequireRole { role, redirect: Some(enabled) },
            Self::RequireAppRole { app_id, role, .. } => {
                Self::RequireAppRole { app_id, role, redirect: Some(enabled) }
            }
            other => other,
        }
    }

    #[must_use]
    pub fn render(&self, ctx: &AuthContextValue) -> GateView {
        if ctx.is_loading {
            return GateView::Loading;
        }

        let allowed = match self {
            Self::SignedIn | Self::RequireAuth { .. } => ctx.is_authenticated,
            Self::SignedOut => !ctx.is_authenticated,
            Self::RequireRole { role, .. } => ctx.user.as_ref().is_some_and(|u| u.has_role(role)),
            Self::RequireAppRole { app_id, role, .. } => {
                ctx.user.as_ref().is_some_and(|u| u.has_app_role(app_id, role))
            }
        };

        if allowed {
            GateView::Children
        } else {
            GateView::Fallback
        }
    }

    /// Login URL to redirect to, if this gate should redirect now.
    ///
    /// Only enforcing gates redirect, only once loading is done, only when
    /// signed out (a signed-in user lacking a role sees the fallback), and
    /// only when redirects are enabled for this gate.
    #[must_use]
    pub fn redirect_target(&self, ctx: &AuthContextValue, return_to: &str) -> Option<String> {
        let override_flag = match self {
            Self::SignedIn | Self::SignedOut => return None,
            Self::RequireAuth { redirect }
            | Self::RequireRole { redirect, .. }
            | Self::RequireAppRole { redirect, .. } => *redirect,
        };

        let enabled = override_flag.unwrap_or(ctx.config.auto_redirect);
        if ctx.is_loading || ctx.is_authenticated || !enabled {
            return None;
        }
        Some(login_url(&ctx.config.login_url, return_to))
    }

    /// Run the redirect side effect. Returns whether navigation happened.
    pub fn effect(&self, ctx: &AuthContextValue, navigator: &dyn Navigator, return_to: &str) -> bool {
        match self.redirect_target(ctx, return_to) {
            Some(url) => {
                navigator.navigate(&url);
                true
            }
            None => false,
        }
    }
}

/// `login_url` with a `returnTo` query parameter appended.
#[must_use]
pub fn login_url(login_url: &str, return_to: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair(RETURN_TO_PARAM, return_to)
        .finish();
    let separator = if login_url.contains('?') { '&' } else { '?' };
    format!("{login_url}{separator}{query}")
}
