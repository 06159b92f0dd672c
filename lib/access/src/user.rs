//! The authenticated user profile and the hooks applied to it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Profile produced by the strategy after a successful credential exchange.
///
/// The gate never looks inside. It is an attribute bag that travels with the
/// session so that handlers behind the gate can read whatever the identity
/// provider returned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthenticatedUser(Map<String, Value>);

impl AuthenticatedUser {
    /// Creates a profile from a JSON object.
    #[must_use]
    pub fn new(attributes: Map<String, Value>) -> Self {
        Self(attributes)
    }

    /// Builds a profile from any JSON value.
    ///
    /// Non-object values are kept under a single `"value"` attribute.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(attributes) => Self(attributes),
            other => {
                let mut attributes = Map::new();
                attributes.insert("value".to_string(), other);
                Self(attributes)
            }
        }
    }

    /// Returns a single attribute.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns all attributes.
    #[must_use]
    pub fn attributes(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Converts the profile into a JSON value.
    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

/// Transforms applied to a profile as it enters and leaves the session.
///
/// All three default to the identity. They are plain function pointers set at
/// construction time.
#[derive(Debug, Clone, Copy)]
pub struct ProfileHooks {
    /// Accepts the strategy's profile before it is attached to the session.
    pub verify: fn(AuthenticatedUser) -> AuthenticatedUser,
    /// Converts a profile into the form stored by the session store.
    pub serialize: fn(&AuthenticatedUser) -> Value,
    /// Rebuilds a profile from its stored form.
    pub deserialize: fn(Value) -> AuthenticatedUser,
}

impl Default for ProfileHooks {
    fn default() -> Self {
        Self {
            verify: accept_profile,
            serialize: store_profile,
            deserialize: AuthenticatedUser::from_value,
        }
    }
}

fn accept_profile(profile: AuthenticatedUser) -> AuthenticatedUser {
    profile
}

fn store_profile(profile: &AuthenticatedUser) -> Value {
    profile.clone().into_value()
}
