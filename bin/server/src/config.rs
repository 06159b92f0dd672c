//! Centralized server configuration.
//!
//! Everything is loaded via the `config` crate from environment variables.
//! Nested keys use `__` as the separator, e.g. `SESSION__DURATION_MINUTES`
//! or `GATE__PROVIDER__CLIENT_ID`.
//!
//! Provider credentials have a second, flatter source: `AUTH_PROVIDER_DOMAIN`,
//! `AUTH_PROVIDER_CLIENT_ID` and `AUTH_PROVIDER_CLIENT_SECRET`. Those are the
//! environment defaults that `GATE__PROVIDER__*` overrides win over.

use axum_extra::extract::cookie::Key;
use gatehouse_access::{ProviderOverrides, Settings, SettingsOverrides};
use serde::Deserialize;
use std::collections::HashMap;

use crate::error::StartupError;

/// Minimum length of a configured cookie secret, in bytes.
pub const MIN_COOKIE_SECRET_LEN: usize = 32;

/// Longest accepted session lifetime: one year.
pub const MAX_SESSION_DURATION_MINUTES: i64 = 525_600;

/// Prefix of the provider environment defaults.
const PROVIDER_ENV_PREFIX: &str = "AUTH_PROVIDER";

/// Server configuration composed from library configs.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Address to bind the HTTP listener to.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Externally visible base URL, used to build the provider redirect URI.
    #[serde(default = "default_public_url")]
    pub public_url: String,

    /// PostgreSQL connection URL. Sessions are kept in memory when unset.
    #[serde(default)]
    pub database_url: Option<String>,

    /// Session configuration.
    #[serde(default)]
    pub session: SessionConfig,

    /// Caller overrides for the gate settings.
    #[serde(default)]
    pub gate: SettingsOverrides,
}

/// Session-related configuration.
#[derive(Clone, Deserialize)]
pub struct SessionConfig {
    /// Session duration in minutes.
    #[serde(default = "default_session_duration_minutes")]
    pub duration_minutes: i64,

    /// Interval between session cleanup runs, in seconds.
    #[serde(default = "default_cleanup_interval_seconds")]
    pub cleanup_interval_seconds: u64,

    /// Whether to set the Secure flag on cookies (requires HTTPS).
    /// Defaults to true; set to false for local HTTP development.
    #[serde(default = "default_secure_cookies")]
    pub secure_cookies: bool,

    /// Secret the session cookie is signed with. A random key is generated
    /// per process when unset, which signs everyone out on restart.
    #[serde(default)]
    pub cookie_secret: Option<String>,
}

fn default_listen_addr() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_public_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_session_duration_minutes() -> i64 {
    60
}

fn default_cleanup_interval_seconds() -> u64 {
    300
}

fn default_secure_cookies() -> bool {
    true
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            duration_minutes: default_session_duration_minutes(),
            cleanup_interval_seconds: default_cleanup_interval_seconds(),
            secure_cookies: default_secure_cookies(),
            cookie_secret: None,
        }
    }
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("duration_minutes", &self.duration_minutes)
            .field("cleanup_interval_seconds", &self.cleanup_interval_seconds)
            .field("secure_cookies", &self.secure_cookies)
            .field("cookie_secret", &self.cookie_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl SessionConfig {
    /// Checks the session lifetime and cleanup interval.
    ///
    /// # Errors
    ///
    /// Returns an error if the duration is outside
    /// `1..=`[`MAX_SESSION_DURATION_MINUTES`] or the cleanup interval is zero.
    pub fn validate(&self) -> Result<(), StartupError> {
        if !(1..=MAX_SESSION_DURATION_MINUTES).contains(&self.duration_minutes) {
            return Err(StartupError::Configuration {
                details: format!(
                    "session.duration_minutes must be between 1 and {}, got {}",
                    MAX_SESSION_DURATION_MINUTES, self.duration_minutes
                ),
            });
        }

        if self.cleanup_interval_seconds == 0 {
            return Err(StartupError::Configuration {
                details: "session.cleanup_interval_seconds must be at least 1".to_string(),
            });
        }

        Ok(())
    }

    /// Builds the cookie signing key.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured secret is shorter than
    /// [`MIN_COOKIE_SECRET_LEN`] bytes.
    pub fn cookie_key(&self) -> Result<Key, StartupError> {
        match &self.cookie_secret {
            Some(secret) if secret.len() < MIN_COOKIE_SECRET_LEN => {
                Err(StartupError::CookieSecret {
                    length: secret.len(),
                })
            }
            Some(secret) => Ok(Key::derive_from(secret.as_bytes())),
            None => Ok(Key::generate()),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration values are present but invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_source(None)
    }

    /// Loads configuration from an explicit variable map instead of the
    /// process environment.
    pub fn from_source(
        source: Option<HashMap<String, String>>,
    ) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true)
                    .source(source),
            )
            .build()?
            .try_deserialize()
    }
}

/// Reads the provider environment defaults.
///
/// # Errors
///
/// Returns an error if the variables cannot be deserialized.
pub fn provider_environment(
    source: Option<HashMap<String, String>>,
) -> Result<ProviderOverrides, config::ConfigError> {
    config::Config::builder()
        .add_source(
            config::Environment::with_prefix(PROVIDER_ENV_PREFIX)
                .prefix_separator("_")
                .source(source),
        )
        .build()?
        .try_deserialize()
}

/// Rejects settings axum could not route.
///
/// # Errors
///
/// Returns an error if a route path does not start with `/`, or if the logout
/// path collides with the login or callback path.
pub fn validate_routes(settings: &Settings) -> Result<(), StartupError> {
    let paths = [
        ("login_path", settings.login_path.as_str()),
        ("provider.callback_path", settings.provider.callback_path.as_str()),
        ("logout_path", settings.logout_path.as_str()),
        ("default_return_path", settings.default_return_path.as_str()),
        ("failure_path", settings.failure_path()),
    ];

    for (name, path) in paths {
        if !path.starts_with('/') {
            return Err(StartupError::InvalidSettings {
                details: format!("{name} '{path}' must start with '/'"),
            });
        }
    }

    if settings.logout_path == settings.login_path
        || settings.logout_path == settings.provider.callback_path
    {
        return Err(StartupError::InvalidSettings {
            details: format!(
                "logout_path '{}' must differ from the login and callback paths",
                settings.logout_path
            ),
        });
    }

    Ok(())
}
