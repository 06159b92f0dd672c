//! Gate settings and their resolution from layered sources.
//!
//! Settings are built once at startup from three layers, lowest precedence
//! first:
//!
//! 1. [`Settings::builtin`]: compiled-in paths.
//! 2. Environment-derived provider fields ([`ProviderOverrides`]).
//! 3. Caller-supplied [`SettingsOverrides`].
//!
//! [`resolve`] merges the layers into a fresh value and never touches its
//! inputs, so the same defaults can be resolved again with other overrides.

use serde::Deserialize;
use std::fmt;

const DEFAULT_LOGIN_PATH: &str = "/login";
const DEFAULT_CALLBACK_PATH: &str = "/callback";
const DEFAULT_RETURN_PATH: &str = "/";
const DEFAULT_LOGOUT_PATH: &str = "/logout";

/// Identity provider settings handed to the strategy.
///
/// Every credential field is optional. Whether a missing domain or client id
/// is acceptable is for the strategy to decide.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Provider domain, e.g. `tenant.eu.auth0.com`.
    pub domain: Option<String>,
    /// OAuth2 client id.
    pub client_id: Option<String>,
    /// OAuth2 client secret.
    pub client_secret: Option<String>,
    /// Path the provider redirects back to after authentication.
    pub callback_path: String,
}

impl ProviderConfig {
    fn merged_with(&self, overrides: &ProviderOverrides) -> Self {
        Self {
            domain: overrides.domain.clone().or_else(|| self.domain.clone()),
            client_id: overrides.client_id.clone().or_else(|| self.client_id.clone()),
            client_secret: overrides
                .client_secret
                .clone()
                .or_else(|| self.client_secret.clone()),
            callback_path: overrides
                .callback_path
                .clone()
                .unwrap_or_else(|| self.callback_path.clone()),
        }
    }
}

// Keeps the client secret out of logs.
impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("domain", &self.domain)
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("callback_path", &self.callback_path)
            .finish()
    }
}

/// Resolved, immutable gate settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Settings passed through to the identity provider strategy.
    pub provider: ProviderConfig,
    /// Where unauthenticated requests are sent.
    pub login_path: String,
    /// Where a failed provider callback is sent. Falls back to `login_path`.
    pub failure_path: Option<String>,
    /// Where a successful login lands when nothing was captured.
    pub default_return_path: String,
    /// Path of the logout route.
    pub logout_path: String,
}

impl Settings {
    /// Returns the compiled-in defaults.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            provider: ProviderConfig {
                domain: None,
                client_id: None,
                client_secret: None,
                callback_path: DEFAULT_CALLBACK_PATH.to_string(),
            },
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            failure_path: None,
            default_return_path: DEFAULT_RETURN_PATH.to_string(),
            logout_path: DEFAULT_LOGOUT_PATH.to_string(),
        }
    }

    /// Returns the path a failed login redirects to.
    #[must_use]
    pub fn failure_path(&self) -> &str {
        self.failure_path.as_deref().unwrap_or(&self.login_path)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Partial provider settings. `None` keeps the lower layer's value.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProviderOverrides {
    pub domain: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub callback_path: Option<String>,
}

impl fmt::Debug for ProviderOverrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderOverrides")
            .field("domain", &self.domain)
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("callback_path", &self.callback_path)
            .finish()
    }
}

/// Partial gate settings supplied by the caller.
///
/// Overrides need not be complete: only `Some` fields replace defaults, and
/// inside `provider` only the sub-fields that are set are replaced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SettingsOverrides {
    pub provider: ProviderOverrides,
    pub login_path: Option<String>,
    pub failure_path: Option<String>,
    pub default_return_path: Option<String>,
    pub logout_path: Option<String>,
}

/// Merges environment-derived provider fields and caller overrides over the
/// built-in defaults.
///
/// Environment values are applied first, so any provider field the caller
/// sets explicitly wins over the environment.
#[must_use]
pub fn resolve(
    builtin: &Settings,
    environment: &ProviderOverrides,
    overrides: &SettingsOverrides,
) -> Settings {
    let provider = builtin
        .provider
        .merged_with(environment)
        .merged_with(&overrides.provider);

    Settings {
        provider,
        login_path: pick(&overrides.login_path, &builtin.login_path),
        failure_path: overrides
            .failure_path
            .clone()
            .or_else(|| builtin.failure_path.clone()),
        default_return_path: pick(&overrides.default_return_path, &builtin.default_return_path),
        logout_path: pick(&overrides.logout_path, &builtin.logout_path),
    }
}

fn pick(value: &Option<String>, fallback: &str) -> String {
    value.clone().unwrap_or_else(|| fallback.to_string())
}
