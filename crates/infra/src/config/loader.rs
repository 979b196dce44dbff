//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. Reads a `.env` file into the environment if one exists
//! 2. Attempts to load from environment variables
//! 3. If incomplete, falls back to loading from file
//! 4. Probes multiple paths for config files
//! 5. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! Required:
//! - `SSOKIT_IDENTITY_BASE_URL`: Identity provider base URL
//! - `SSOKIT_CLIENT_ID`: Registered OAuth client id
//! - `SSOKIT_REDIRECT_URI`: Registered callback URL
//!
//! Optional client settings:
//! - `SSOKIT_SCOPES`: Space- or comma-separated scope list
//! - `SSOKIT_AUTO_REDIRECT`: Gates redirect to login (true/false)
//! - `SSOKIT_POST_LOGOUT_REDIRECT_URI`: End-session return URL
//! - `SSOKIT_REFRESH_BUFFER_MS`: Early-expiry buffer in milliseconds
//! - `SSOKIT_HTTP_TIMEOUT_SECS`: Provider request timeout
//!
//! Optional server settings:
//! - `SSOKIT_COOKIE_PREFIX`, `SSOKIT_COOKIE_MAX_AGE_DAYS`,
//!   `SSOKIT_SECURE_COOKIES`, `SSOKIT_AUTH_PATH`, `SSOKIT_LOGIN_PATH`,
//!   `SSOKIT_LOGIN_REDIRECT`, `SSOKIT_LOGOUT_REDIRECT`,
//!   `SSOKIT_ERROR_REDIRECT`, `SSOKIT_RP_INITIATED_LOGOUT`
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./config.json` or `./config.toml` (current working directory)
//! 2. `./ssokit.json` or `./ssokit.toml` (current working directory)
//! 3. `../config.json` or `../config.toml` (parent directory)
//! 4. `../../config.json` or `../../config.toml` (grandparent directory)
//! 5. Relative to executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ssokit_domain::{Result, SsoConfig, SsoError};

use crate::server::ServerSettings;

/// Everything a deployment configures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub sso: SsoConfig,
    #[serde(default)]
    pub server: ServerSettings,
}

impl AppConfig {
    /// # Errors
    /// Returns `SsoError::Configuration` for the first invalid field.
    pub fn validate(&self) -> Result<()> {
        self.sso.validate()?;
        self.server.validate()
    }
}

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables (after reading any
/// `.env` file). If none of the required variables are set, falls back to
/// loading from a config file; an invalid environment is an error.
///
/// # Errors
/// Returns `SsoError::Configuration` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - Required fields are missing or invalid
pub fn load() -> Result<AppConfig> {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!(path = %path.display(), "Loaded .env file");
    }

    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        // A partially configured environment is a mistake, not a cue to
        // fall back to a file
        Err(e) if REQUIRED_ENV.iter().any(|key| optional_env(key).is_some()) => Err(e),
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

const REQUIRED_ENV: [&str; 3] = ["SSOKIT_IDENTITY_BASE_URL", "SSOKIT_CLIENT_ID", "SSOKIT_REDIRECT_URI"];

/// Load configuration from environment variables
///
/// # Errors
/// Returns `SsoError::Configuration` if required variables are missing
/// or any value is invalid.
pub fn load_from_env() -> Result<AppConfig> {
    let mut sso = SsoConfig::new(
        env_var("SSOKIT_IDENTITY_BASE_URL")?,
        env_var("SSOKIT_CLIENT_ID")?,
        env_var("SSOKIT_REDIRECT_URI")?,
    );

    if let Some(scopes) = optional_env("SSOKIT_SCOPES") {
        sso.scopes = scopes
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
    }
    sso.auto_redirect = env_bool("SSOKIT_AUTO_REDIRECT", sso.auto_redirect)?;
    sso.post_logout_redirect_uri = optional_env("SSOKIT_POST_LOGOUT_REDIRECT_URI");
    if let Some(buffer) = env_parse::<i64>("SSOKIT_REFRESH_BUFFER_MS")? {
        sso.refresh_buffer_ms = buffer;
    }
    if let Some(secs) = env_parse::<u64>("SSOKIT_HTTP_TIMEOUT_SECS")? {
        sso.http_timeout_secs = secs;
    }

    let mut server = ServerSettings::default();
    if let Some(prefix) = optional_env("SSOKIT_COOKIE_PREFIX") {
        server.cookie_prefix = prefix;
    }
    if let Some(days) = env_parse::<i64>("SSOKIT_COOKIE_MAX_AGE_DAYS")? {
        server.cookie_max_age_days = days;
    }
    server.secure_cookies = env_bool("SSOKIT_SECURE_COOKIES", server.secure_cookies)?;
    server.rp_initiated_logout = env_bool("SSOKIT_RP_INITIATED_LOGOUT", server.rp_initiated_logout)?;
    for (key, field) in [
        ("SSOKIT_AUTH_PATH", &mut server.auth_path),
        ("SSOKIT_LOGIN_PATH", &mut server.login_path),
        ("SSOKIT_LOGIN_REDIRECT", &mut server.login_redirect),
        ("SSOKIT_LOGOUT_REDIRECT", &mut server.logout_redirect),
        ("SSOKIT_ERROR_REDIRECT", &mut server.error_redirect),
    ] {
        if let Some(value) = optional_env(key) {
            *field = value;
        }
    }

    let config = AppConfig { sso, server };
    config.validate()?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `SsoError::Configuration` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - Required fields are missing or invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<AppConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(SsoError::Configuration(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            SsoError::Configuration("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| SsoError::Configuration(format!("Failed to read config file: {e}")))?;

    let config = parse_config(&contents, &config_path)?;
    config.validate()?;
    Ok(config)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<AppConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| SsoError::Configuration(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| SsoError::Configuration(format!("Invalid JSON format: {e}"))),
        _ => Err(SsoError::Configuration(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe multiple paths for configuration files
///
/// Returns the first config file found, or `None` if no file exists.
#[must_use]
pub fn probe_config_paths() -> Option<PathBuf> {
    let names = ["config.json", "config.toml", "ssokit.json", "ssokit.toml"];
    let parents = ["../config.json", "../config.toml", "../../config.json", "../../config.toml"];

    let mut roots = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        roots.push(cwd);
    }
    if let Some(exe_dir) = std::env::current_exe().ok().and_then(|p| p.parent().map(Path::to_path_buf)) {
        roots.push(exe_dir);
    }

    roots
        .iter()
        .flat_map(|root| names.iter().chain(parents.iter()).map(move |name| root.join(name)))
        .find(|path| path.exists())
}

/// Get required environment variable
fn env_var(key: &str) -> Result<String> {
    optional_env(key).ok_or_else(|| {
        SsoError::Configuration(format!("Missing required environment variable: {key}"))
    })
}

/// Non-empty environment variable
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    optional_env(key)
        .map(|raw| {
            raw.parse::<T>().map_err(|e| SsoError::Configuration(format!("Invalid {key}: {e}")))
        })
        .transpose()
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive).
/// Unset or empty yields `default`; anything else is a configuration error.
fn env_bool(key: &str, default: bool) -> Result<bool> {
    let Some(raw) = optional_env(key) else {
        return Ok(default);
    };
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(SsoError::Configuration(format!("Invalid {key}: expected a boolean, got {raw:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Mutex;

    use tempfile::NamedTempFile;

    use super::*;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const REQUIRED: [(&str, &str); 3] = [
        ("SSOKIT_IDENTITY_BASE_URL", "https://id.example.com"),
        ("SSOKIT_CLIENT_ID", "abc"),
        ("SSOKIT_REDIRECT_URI", "https://app.example.com/callback"),
    ];

    const OPTIONAL: [&str; 7] = [
        "SSOKIT_SCOPES",
        "SSOKIT_SECURE_COOKIES",
        "SSOKIT_REFRESH_BUFFER_MS",
        "SSOKIT_COOKIE_PREFIX",
        "SSOKIT_ERROR_REDIRECT",
        "SSOKIT_AUTO_REDIRECT",
        "SSOKIT_HTTP_TIMEOUT_SECS",
    ];

    fn clear_env() {
        for (key, _) in REQUIRED {
            std::env::remove_var(key);
        }
        for key in OPTIONAL {
            std::env::remove_var(key);
        }
    }

    fn write_temp(contents: &str, extension: &str) -> PathBuf {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(contents.as_bytes()).unwrap();
        let path = temp_file.path().with_extension(extension);
        std::fs::copy(temp_file.path(), &path).unwrap();
        path
    }

    #[test]
    fn test_env_bool_parsing() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");

        for (i, value) in ["1", "true", "yes", "on", "TRUE"].iter().enumerate() {
            let key = format!("SSOKIT_TEST_BOOL_TRUE_{i}");
            std::env::set_var(&key, value);
            assert!(env_bool(&key, false).unwrap());
            std::env::remove_var(&key);
        }
        for (i, value) in ["0", "false", "no", "off"].iter().enumerate() {
            let key = format!("SSOKIT_TEST_BOOL_FALSE_{i}");
            std::env::set_var(&key, value);
            assert!(!env_bool(&key, true).unwrap());
            std::env::remove_var(&key);
        }

        std::env::remove_var("SSOKIT_TEST_BOOL_MISSING");
        assert!(env_bool("SSOKIT_TEST_BOOL_MISSING", true).unwrap());
        assert!(!env_bool("SSOKIT_TEST_BOOL_MISSING", false).unwrap());

        std::env::set_var("SSOKIT_TEST_BOOL_TYPO", "ture");
        let err = env_bool("SSOKIT_TEST_BOOL_TYPO", true).unwrap_err();
        assert!(matches!(err, SsoError::Configuration(msg) if msg.contains("SSOKIT_TEST_BOOL_TYPO")));
        std::env::remove_var("SSOKIT_TEST_BOOL_TYPO");
    }

    #[test]
    fn test_load_from_env_rejects_invalid_boolean() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        for (key, value) in REQUIRED {
            std::env::set_var(key, value);
        }
        std::env::set_var("SSOKIT_SECURE_COOKIES", "ture");

        let err = load_from_env().unwrap_err();
        assert!(matches!(err, SsoError::Configuration(msg) if msg.contains("SSOKIT_SECURE_COOKIES")));

        clear_env();
    }

    #[test]
    fn test_load_from_env_all_vars_set() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        for (key, value) in REQUIRED {
            std::env::set_var(key, value);
        }
        std::env::set_var("SSOKIT_SCOPES", "openid, profile");
        std::env::set_var("SSOKIT_SECURE_COOKIES", "false");
        std::env::set_var("SSOKIT_REFRESH_BUFFER_MS", "5000");
        std::env::set_var("SSOKIT_COOKIE_PREFIX", "docs");
        std::env::set_var("SSOKIT_ERROR_REDIRECT", "/login");

        let result = load_from_env();
        clear_env();

        let config = result.expect("config from env");
        assert_eq!(config.sso.client_id, "abc");
        assert_eq!(config.sso.scopes, vec!["openid", "profile"]);
        assert_eq!(config.sso.refresh_buffer_ms, 5000);
        assert!(!config.server.secure_cookies);
        assert_eq!(config.server.access_cookie(), "docs_access_token");
        assert_eq!(config.server.error_redirect, "/login");
        assert_eq!(config.server.auth_path, "/api/auth");
    }

    #[test]
    fn test_load_from_env_missing_var() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        let err = load_from_env().unwrap_err();
        assert!(matches!(err, SsoError::Configuration(_)), "Should be a Configuration error");
    }

    #[test]
    fn test_load_from_env_invalid_number() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        for (key, value) in REQUIRED {
            std::env::set_var(key, value);
        }
        std::env::set_var("SSOKIT_HTTP_TIMEOUT_SECS", "soon");

        let result = load_from_env();
        clear_env();

        assert!(matches!(result, Err(SsoError::Configuration(msg)) if msg.contains("SSOKIT_HTTP_TIMEOUT_SECS")));
    }

    #[test]
    fn test_load_from_env_invalid_url() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        for (key, value) in REQUIRED {
            std::env::set_var(key, value);
        }
        std::env::set_var("SSOKIT_IDENTITY_BASE_URL", "not a url");

        let result = load_from_env();
        clear_env();

        assert!(matches!(result, Err(SsoError::Configuration(_))));
    }

    #[test]
    fn test_load_from_file_json() {
        let path = write_temp(
            r#"{
                "sso": {
                    "identity_base_url": "https://id.example.com",
                    "client_id": "abc",
                    "redirect_uri": "https://app.example.com/callback"
                },
                "server": { "secure_cookies": false }
            }"#,
            "json",
        );

        let result = load_from_file(Some(path.clone()));
        std::fs::remove_file(path).ok();

        let config = result.expect("config from JSON");
        assert_eq!(config.sso.scopes, vec!["openid", "profile", "email", "offline_access"]);
        assert!(!config.server.secure_cookies);
        assert_eq!(config.server.cookie_max_age_days, 30);
    }

    #[test]
    fn test_load_from_file_toml() {
        let path = write_temp(
            r#"
[sso]
identity_base_url = "https://id.example.com"
client_id = "abc"
redirect_uri = "https://app.example.com/callback"
scopes = ["openid"]

[server]
auth_path = "/auth"
"#,
            "toml",
        );

        let result = load_from_file(Some(path.clone()));
        std::fs::remove_file(path).ok();

        let config = result.expect("config from TOML");
        assert_eq!(config.sso.scopes, vec!["openid"]);
        assert_eq!(config.server.route("callback"), "/auth/callback");
    }

    #[test]
    fn test_load_from_file_not_found() {
        let result = load_from_file(Some(PathBuf::from("/nonexistent/config.json")));
        assert!(matches!(result, Err(SsoError::Configuration(_))));
    }

    #[test]
    fn test_load_from_file_rejects_invalid_values() {
        let path = write_temp(
            r#"{"sso": {"identity_base_url": "https://id.example.com", "client_id": "", "redirect_uri": "https://app/cb"}}"#,
            "json",
        );

        let result = load_from_file(Some(path.clone()));
        std::fs::remove_file(path).ok();

        assert!(matches!(result, Err(SsoError::Configuration(_))));
    }

    #[test]
    fn test_parse_config_unsupported_format() {
        let result = parse_config("some content", &PathBuf::from("test.yaml"));
        assert!(result.is_err(), "Should fail with unsupported format");
    }
}
