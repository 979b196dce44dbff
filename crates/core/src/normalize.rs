//! Session normalization
//!
//! Maps raw UserInfo claims into the domain [`Session`] shape. Defaulting
//! rules for optional claims are owned by [`UserInfoClaims`].

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ssokit_domain::{Result, Session, SsoError, TokenSet, User, UserInfoClaims};

/// Project UserInfo claims and the token expiry into a [`Session`].
///
/// `token_expires_at_ms` is the Token Set's absolute expiry in epoch
/// milliseconds; the session carries it as a UTC timestamp.
#[must_use]
pub fn normalize_user_info(claims: &UserInfoClaims, token_expires_at_ms: i64) -> Session {
    let user = User {
        user_id: claims.sub.clone(),
        email: claims.email.clone(),
        email_verified: claims.email_verified(),
        name: claims.name.clone(),
        username: claims.username.clone(),
        image: claims.picture.clone(),
        roles: claims.roles(),
        app_roles: claims.app_roles(),
    };

    Session {
        session_id: claims.session_id().to_string(),
        user,
        expires_at: TokenSet::new(String::new(), token_expires_at_ms).expires_at_utc(),
    }
}

/// Decode the payload segment of a signed UserInfo JWT.
///
/// The signature is not checked here: the response came straight from the
/// provider over an authenticated bearer call.
///
/// # Errors
/// Returns [`SsoError::InvalidResponse`] if the token is not a three-part
/// JWT or its payload does not match the claims schema.
pub fn decode_jwt_claims(jwt: &str) -> Result<UserInfoClaims> {
    let parts: Vec<&str> = jwt.trim().split('.').collect();
    if parts.len() != 3 {
        return Err(SsoError::InvalidResponse("userinfo JWT must have three segments".into()));
    }

    let payload = URL_SAFE_NO_PAD
        .decode(parts[1].trim_end_matches('='))
        .map_err(|e| SsoError::InvalidResponse(format!("userinfo JWT payload: {e}")))?;

    UserInfoClaims::from_slice(&payload)
}

/// Decode a UserInfo response body according to its content type.
///
/// # Errors
/// Returns [`SsoError::InvalidResponse`] if the body cannot be decoded.
pub fn parse_user_info_body(content_type: Option<&str>, body: &[u8]) -> Result<UserInfoClaims> {
    let is_jwt =
        content_type.is_some_and(|ct| ct.trim().to_ascii_lowercase().starts_with("application/jwt"));

    if is_jwt {
        let jwt = std::str::from_utf8(body)
            .map_err(|e| SsoError::InvalidResponse(format!("userinfo JWT encoding: {e}")))?;
        decode_jwt_claims(jwt)
    } else {
        UserInfoClaims::from_slice(body)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn jwt_for(payload: &serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
        let body = URL_SAFE_NO_PAD.encode(payload.to_string());
        format!("{header}.{body}.c2lnbmF0dXJl")
    }

    #[test]
    fn maps_claims_onto_user() {
        let claims = UserInfoClaims::from_value(json!({
            "sub": "u-1",
            "email": "ada@example.com",
            "email_verified": true,
            "name": "Ada",
            "username": "ada",
            "picture": "https://cdn.example.com/ada.png",
            "roles": ["admin", "user"],
            "app_roles": { "billing": ["owner"] }
        }))
        .unwrap();

        let session = normalize_user_info(&claims, 1_700_000_000_000);

        assert_eq!(session.session_id, "u-1");
        assert_eq!(session.user.user_id, "u-1");
        assert_eq!(session.user.email.as_deref(), Some("ada@example.com"));
        assert!(session.user.email_verified);
        assert_eq!(session.user.image.as_deref(), Some("https://cdn.example.com/ada.png"));
        assert_eq!(session.user.roles, vec!["admin", "user"]);
        assert_eq!(session.user.app_roles["billing"], vec!["owner"]);
        assert_eq!(session.expires_at.timestamp_millis(), 1_700_000_000_000);
    }

    #[test]
    fn omitted_roles_default_to_user() {
        let session = normalize_user_info(&UserInfoClaims::new("u-1"), 0);
        assert_eq!(session.user.roles, vec!["user"]);
        assert!(session.user.app_roles.is_empty());
    }

    #[test]
    fn jti_becomes_session_id() {
        let mut claims = UserInfoClaims::new("u-1");
        claims.jti = Some("tok-7".into());
        assert_eq!(normalize_user_info(&claims, 0).session_id, "tok-7");
    }

    #[test]
    fn does_not_mutate_input() {
        let claims = UserInfoClaims::new("u-1");
        let before = claims.clone();
        let _ = normalize_user_info(&claims, 0);
        assert_eq!(claims, before);
    }

    #[test]
    fn decodes_signed_userinfo() {
        let jwt = jwt_for(&json!({ "sub": "u-2", "jti": "j-1", "exp": 1_900_000_000 }));
        let claims = parse_user_info_body(Some("application/jwt; charset=utf-8"), jwt.as_bytes())
            .unwrap();
        assert_eq!(claims.sub, "u-2");
        assert_eq!(claims.session_id(), "j-1");
        assert_eq!(claims.exp, Some(1_900_000_000));
    }

    #[test]
    fn rejects_malformed_jwt() {
        assert!(decode_jwt_claims("only.two").is_err());
        assert!(decode_jwt_claims("a.!!!.c").is_err());
    }

    #[test]
    fn parses_json_body() {
        let claims = parse_user_info_body(Some("application/json"), br#"{"sub":"u-3"}"#).unwrap();
        assert_eq!(claims.sub, "u-3");
    }
}
