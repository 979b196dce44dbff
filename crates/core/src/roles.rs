//! Role and permission views
//!
//! Pure predicates over already-granted claims. These drive UI rendering
//! only and are not an authorization boundary: servers must check roles
//! against their own policy.

use ssokit_domain::{Session, User};

/// `true` if the session's user holds `role`.
#[must_use]
pub fn has_role(session: Option<&Session>, role: &str) -> bool {
    session.is_some_and(|s| s.user.has_role(role))
}

/// `true` if the session's user holds `role` within `app_id`'s namespace.
#[must_use]
pub fn has_app_role(session: Option<&Session>, app_id: &str, role: &str) -> bool {
    session.is_some_and(|s| s.user.has_app_role(app_id, role))
}

/// `true` if the session's user holds every role in `roles`.
///
/// An empty list is vacuously satisfied by any signed-in user.
#[must_use]
pub fn has_all_roles<S: AsRef<str>>(session: Option<&Session>, roles: &[S]) -> bool {
    session.is_some_and(|s| s.user.has_all_roles(roles))
}

/// `true` if the session's user holds at least one role in `roles`.
#[must_use]
pub fn has_any_role<S: AsRef<str>>(session: Option<&Session>, roles: &[S]) -> bool {
    session.is_some_and(|s| s.user.has_any_role(roles))
}

/// Role checks on a [`User`].
pub trait RoleView {
    fn has_role(&self, role: &str) -> bool;
    fn has_app_role(&self, app_id: &str, role: &str) -> bool;
    fn has_all_roles<S: AsRef<str>>(&self, roles: &[S]) -> bool;
    fn has_any_role<S: AsRef<str>>(&self, roles: &[S]) -> bool;
}

impl RoleView for User {
    fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    fn has_app_role(&self, app_id: &str, role: &str) -> bool {
        self.app_roles.get(app_id).is_some_and(|roles| roles.iter().any(|r| r == role))
    }

    fn has_all_roles<S: AsRef<str>>(&self, roles: &[S]) -> bool {
        roles.iter().all(|role| self.has_role(role.as_ref()))
    }

    fn has_any_role<S: AsRef<str>>(&self, roles: &[S]) -> bool {
        roles.iter().any(|role| self.has_role(role.as_ref()))
    }
}
