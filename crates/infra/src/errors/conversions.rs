//! Conversions from external infrastructure errors into domain errors.

use reqwest::Error as HttpError;
use ssokit_domain::SsoError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub SsoError);

impl From<InfraError> for SsoError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<SsoError> for InfraError {
    fn from(value: SsoError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoSsoError {
    fn into_sso(self) -> SsoError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → SsoError */
/* -------------------------------------------------------------------------- */

impl IntoSsoError for HttpError {
    fn into_sso(self) -> SsoError {
        if self.is_timeout() {
            return SsoError::Network("HTTP request timed out".into());
        }

        if self.is_connect() {
            return SsoError::Network("HTTP connection failure".into());
        }

        if self.is_builder() {
            return SsoError::Configuration(format!("invalid HTTP request: {self}"));
        }

        if self.is_decode() {
            return SsoError::InvalidResponse(format!("undecodable HTTP body: {self}"));
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            return SsoError::Network(format!(
                "HTTP {} {}",
                code,
                status.canonical_reason().unwrap_or("unknown status")
            ));
        }

        SsoError::Network(format!("HTTP request failed: {self}"))
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_sso())
    }
}

/* -------------------------------------------------------------------------- */
/* std::io::Error / serde_json::Error → SsoError */
/* -------------------------------------------------------------------------- */

impl From<std::io::Error> for InfraError {
    fn from(value: std::io::Error) -> Self {
        InfraError(SsoError::Storage(format!("I/O failure: {value}")))
    }
}

impl From<serde_json::Error> for InfraError {
    fn from(value: serde_json::Error) -> Self {
        InfraError(SsoError::Storage(format!("corrupt JSON: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
