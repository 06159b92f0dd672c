//! Authentication wiring for the gatehouse server.
//!
//! This module provides:
//! - The shared [`AppState`]
//! - The `require_login` middleware that puts routes behind the gate
//! - The login/callback and logout routes
//! - An OIDC [`Strategy`](gatehouse_access::Strategy) implementation
//!
//! The session cookie is signed with the configured key and carries only the
//! session ID; everything else lives in the [`SessionStore`].

pub mod middleware;
pub mod oidc;
pub mod routes;

use axum::extract::FromRef;
use axum_extra::extract::SignedCookieJar;
use axum_extra::extract::cookie::{Cookie, Key, SameSite};
use gatehouse_access::{AuthGate, Strategy};
use gatehouse_core::{Result, SessionId};
use std::sync::Arc;
use time::Duration as TimeDuration;

use crate::config::SessionConfig;
use crate::error::SessionStoreError;
use crate::sessions::{SessionRecord, SessionStore};

pub use middleware::{CurrentUser, require_login};
pub use oidc::OidcStrategy;
pub use routes::{login, logout};

/// Session cookie name.
pub const SESSION_COOKIE: &str = "session";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// The login gate.
    pub gate: Arc<AuthGate>,
    /// Identity provider integration.
    pub strategy: Arc<dyn Strategy>,
    /// Session persistence.
    pub sessions: Arc<dyn SessionStore>,
    /// Session configuration.
    pub session_config: SessionConfig,
    /// Key the session cookie is signed with.
    pub cookie_key: Key,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(
        gate: AuthGate,
        strategy: Arc<dyn Strategy>,
        sessions: Arc<dyn SessionStore>,
        session_config: SessionConfig,
        cookie_key: Key,
    ) -> Self {
        Self {
            gate: Arc::new(gate),
            strategy,
            sessions,
            session_config,
            cookie_key,
        }
    }

    /// Loads the session named by the cookie, or starts a new one.
    ///
    /// Unknown, tampered and expired sessions all yield a fresh record. Expired
    /// ones are deleted on the way.
    pub(crate) async fn load_session(
        &self,
        jar: &SignedCookieJar,
    ) -> Result<SessionRecord, SessionStoreError> {
        let Some(id) = session_id(jar) else {
            return Ok(self.new_session());
        };

        match self.sessions.load(&id).await? {
            Some(record) if record.is_expired() => {
                tracing::debug!(session_id = %id, "session expired");
                self.sessions.delete(&id).await?;
                Ok(self.new_session())
            }
            Some(record) => Ok(record),
            None => Ok(self.new_session()),
        }
    }

    /// Persists a session and returns the jar with its cookie set.
    pub(crate) async fn save_session(
        &self,
        jar: SignedCookieJar,
        record: &SessionRecord,
    ) -> Result<SignedCookieJar, SessionStoreError> {
        self.sessions.save(record).await?;
        Ok(jar.add(self.session_cookie(record)))
    }

    fn new_session(&self) -> SessionRecord {
        SessionRecord::new(chrono::Duration::minutes(
            self.session_config.duration_minutes,
        ))
    }

    fn session_cookie(&self, record: &SessionRecord) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, record.id().to_string()))
            .path("/")
            .http_only(true)
            .secure(self.session_config.secure_cookies)
            .same_site(SameSite::Lax)
            .max_age(TimeDuration::minutes(self.session_config.duration_minutes))
            .build()
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

/// Reads the session ID from a verified cookie.
pub(crate) fn session_id(jar: &SignedCookieJar) -> Option<SessionId> {
    jar.get(SESSION_COOKIE)
        .and_then(|cookie| cookie.value().parse().ok())
}
