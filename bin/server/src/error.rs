//! Server error types.
//!
//! Store and startup errors are layered with rootcause `Report`s. `AuthError`
//! is the HTTP-facing error of the auth routes and middleware; it logs the
//! full report and answers with a user-safe message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use gatehouse_access::GateError;
use rootcause::Report;
use std::fmt;

/// Session store errors.
#[derive(Debug)]
pub enum SessionStoreError {
    /// Database error while accessing sessions.
    Database { details: String },
    /// A stored session could not be decoded or encoded.
    Serialization { details: String },
}

impl fmt::Display for SessionStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Database { details } => write!(f, "session database error: {}", details),
            Self::Serialization { details } => {
                write!(f, "session serialization error: {}", details)
            }
        }
    }
}

impl std::error::Error for SessionStoreError {}

/// Errors that stop the server from starting.
#[derive(Debug)]
pub enum StartupError {
    /// Environment configuration could not be loaded.
    Configuration { details: String },
    /// Resolved gate settings cannot be routed.
    InvalidSettings { details: String },
    /// The configured cookie secret is too short.
    CookieSecret { length: usize },
    /// The session database is unreachable or could not be migrated.
    Database { details: String },
    /// The identity provider could not be set up.
    Strategy { details: String },
    /// The listener could not be bound.
    Bind { addr: String, details: String },
    /// The server stopped with an error.
    Serve { details: String },
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration { details } => write!(f, "configuration error: {}", details),
            Self::InvalidSettings { details } => write!(f, "invalid gate settings: {}", details),
            Self::CookieSecret { length } => write!(
                f,
                "cookie secret is {} bytes, at least {} are required",
                length,
                crate::config::MIN_COOKIE_SECRET_LEN
            ),
            Self::Database { details } => write!(f, "session database error: {}", details),
            Self::Strategy { details } => write!(f, "identity provider error: {}", details),
            Self::Bind { addr, details } => write!(f, "failed to bind '{}': {}", addr, details),
            Self::Serve { details } => write!(f, "server error: {}", details),
        }
    }
}

impl std::error::Error for StartupError {}

/// Errors surfaced by the auth middleware and routes.
#[derive(Debug)]
pub enum AuthError {
    /// The session store failed.
    Session(Report<SessionStoreError>),
    /// The login route is wired incorrectly.
    Gate(GateError),
}

impl From<Report<SessionStoreError>> for AuthError {
    fn from(report: Report<SessionStoreError>) -> Self {
        Self::Session(report)
    }
}

impl From<GateError> for AuthError {
    fn from(err: GateError) -> Self {
        Self::Gate(err)
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            Self::Session(report) => {
                tracing::error!(error = %report, "session store failure");
            }
            Self::Gate(err) => {
                tracing::error!(error = %err, "login route integration error");
            }
        }

        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
    }
}
