//! OIDC UserInfo claims schema
//!
//! Defaulting rules for optional claims live here, at the normalization
//! boundary, instead of being scattered through callers:
//!
//! | Claim            | Missing / `null` becomes |
//! |------------------|--------------------------|
//! | `jti`            | `sub` (session id)       |
//! | `roles`          | `["user"]`               |
//! | `app_roles`      | `{}`                     |
//! | `email_verified` | `false`                  |
//!
//! `sub` is required and must be non-empty.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_ROLE;
use crate::errors::{Result, SsoError};
use crate::types::AppRoles;

/// Role grant for one application: providers send either a single role or a
/// list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RoleList {
    One(String),
    Many(Vec<String>),
}

impl RoleList {
    fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(role) => vec![role],
            Self::Many(roles) => roles,
        }
    }
}

/// Raw claims returned by the UserInfo endpoint (JSON or signed JWT
/// payload).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfoClaims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: Option<bool>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub roles: Option<Vec<String>>,
    #[serde(default)]
    pub app_roles: Option<BTreeMap<String, RoleList>>,
    #[serde(default)]
    pub jti: Option<String>,
    #[serde(default)]
    pub exp: Option<i64>,
}

impl UserInfoClaims {
    /// Claims with only the required subject.
    #[must_use]
    pub fn new(sub: impl Into<String>) -> Self {
        Self {
            sub: sub.into(),
            email: None,
            email_verified: None,
            name: None,
            picture: None,
            username: None,
            roles: None,
            app_roles: None,
            jti: None,
            exp: None,
        }
    }

    /// Decode and validate claims from a JSON value.
    ///
    /// # Errors
    /// Returns [`SsoError::InvalidResponse`] if the value does not match the
    /// schema or `sub` is empty.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let claims: Self = serde_json::from_value(value)
            .map_err(|e| SsoError::InvalidResponse(format!("userinfo claims: {e}")))?;
        claims.validate()
    }

    /// Decode and validate claims from a JSON byte slice.
    ///
    /// # Errors
    /// Same as [`UserInfoClaims::from_value`].
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let claims: Self = serde_json::from_slice(bytes)
            .map_err(|e| SsoError::InvalidResponse(format!("userinfo claims: {e}")))?;
        claims.validate()
    }

    fn validate(self) -> Result<Self> {
        if self.sub.trim().is_empty() {
            return Err(SsoError::InvalidResponse("userinfo claims: empty `sub`".to_string()));
        }
        Ok(self)
    }

    /// Token's unique id when present, else the subject.
    #[must_use]
    pub fn session_id(&self) -> &str {
        self.jti.as_deref().filter(|jti| !jti.is_empty()).unwrap_or(&self.sub)
    }

    #[must_use]
    pub fn roles(&self) -> Vec<String> {
        self.roles.clone().unwrap_or_else(|| vec![DEFAULT_ROLE.to_string()])
    }

    #[must_use]
    pub fn app_roles(&self) -> AppRoles {
        self.app_roles
            .clone()
            .map(|grants| grants.into_iter().map(|(app, roles)| (app, roles.into_vec())).collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn email_verified(&self) -> bool {
        self.email_verified.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn missing_optional_claims_take_defaults() {
        let claims = UserInfoClaims::from_value(json!({ "sub": "u-1" })).unwrap();
        assert_eq!(claims.roles(), vec!["user".to_string()]);
        assert!(claims.app_roles().is_empty());
        assert!(!claims.email_verified());
        assert_eq!(claims.session_id(), "u-1");
    }

    #[test]
    fn null_claims_take_defaults() {
        let claims = UserInfoClaims::from_value(json!({
            "sub": "u-1",
            "roles": null,
            "app_roles": null,
            "email_verified": null
        }))
        .unwrap();
        assert_eq!(claims.roles(), vec!["user".to_string()]);
        assert!(claims.app_roles().is_empty());
    }

    #[test]
    fn jti_preferred_for_session_id() {
        let mut claims = UserInfoClaims::new("u-1");
        claims.jti = Some("jti-9".into());
        assert_eq!(claims.session_id(), "jti-9");
    }

    #[test]
    fn app_roles_accept_string_or_list() {
        let claims = UserInfoClaims::from_value(json!({
            "sub": "u-1",
            "app_roles": { "billing": "admin", "docs": ["editor", "viewer"] }
        }))
        .unwrap();
        let app_roles = claims.app_roles();
        assert_eq!(app_roles["billing"], vec!["admin".to_string()]);
        assert_eq!(app_roles["docs"], vec!["editor".to_string(), "viewer".to_string()]);
    }

    #[test]
    fn empty_subject_is_rejected() {
        let err = UserInfoClaims::from_value(json!({ "sub": "  " })).unwrap_err();
        assert!(matches!(err, SsoError::InvalidResponse(_)));
    }

    #[test]
    fn missing_subject_is_rejected() {
        assert!(UserInfoClaims::from_slice(br#"{"email":"a@b.c"}"#).is_err());
    }
}
