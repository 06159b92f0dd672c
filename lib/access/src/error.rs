//! Error types for the access crate.
//!
//! `GateError` covers misuse of the gate by the surrounding routing layer.
//! `StrategyError` covers failed credential exchanges. Neither is used for
//! ordinary redirects, which are plain return values.

use std::fmt;

/// Integration errors raised by the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateError {
    /// `complete_login` ran on a session the strategy never populated.
    ///
    /// The login route is wired incorrectly. This is not retried.
    MissingUser,
}

impl fmt::Display for GateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingUser => {
                write!(f, "login completed without an authenticated user in the session")
            }
        }
    }
}

impl std::error::Error for GateError {}

/// Errors reported by a [`Strategy`](crate::Strategy).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrategyError {
    /// Provider settings are missing or malformed.
    Configuration { details: String },
    /// Provider metadata could not be discovered.
    Discovery { details: String },
    /// The authorization code could not be exchanged.
    TokenExchange { details: String },
    /// The returned tokens failed validation.
    TokenValidation { details: String },
    /// The callback's `state` does not match the pending authorization.
    CsrfMismatch,
    /// The callback arrived without a pending authorization in the session.
    NoPendingAuthorization,
    /// The provider redirected back with an error.
    Provider {
        error: String,
        description: Option<String>,
    },
}

impl fmt::Display for StrategyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration { details } => {
                write!(f, "provider configuration error: {details}")
            }
            Self::Discovery { details } => write!(f, "provider discovery failed: {details}"),
            Self::TokenExchange { details } => write!(f, "token exchange failed: {details}"),
            Self::TokenValidation { details } => {
                write!(f, "token validation failed: {details}")
            }
            Self::CsrfMismatch => write!(f, "callback state does not match"),
            Self::NoPendingAuthorization => {
                write!(f, "callback received without a pending authorization")
            }
            Self::Provider {
                error,
                description: Some(description),
            } => write!(f, "provider returned '{error}': {description}"),
            Self::Provider {
                error,
                description: None,
            } => write!(f, "provider returned '{error}'"),
        }
    }
}

impl std::error::Error for StrategyError {}
