//! Session persistence.
//!
//! A [`SessionRecord`] is what a store keeps per browser: the gate's
//! [`SessionState`] in stored form, plus the pending authorization of an
//! in-flight login and the session's lifetime.

mod memory;
mod postgres;

pub use memory::MemorySessionStore;
pub use postgres::PgSessionStore;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use gatehouse_access::{PendingAuthorization, ProfileHooks, SessionState};
use gatehouse_core::{Result, SessionId};

use crate::error::SessionStoreError;

/// A persisted browser session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    id: SessionId,
    /// The signed-in user, as produced by `ProfileHooks::serialize`.
    user: Option<serde_json::Value>,
    return_to: Option<String>,
    pending: Option<PendingAuthorization>,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Starts a new anonymous session valid for `duration`.
    #[must_use]
    pub fn new(duration: Duration) -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::new(),
            user: None,
            return_to: None,
            pending: None,
            created_at: now,
            expires_at: now + duration,
        }
    }

    /// Rebuilds a record from stored columns.
    #[must_use]
    pub fn from_parts(
        id: SessionId,
        user: Option<serde_json::Value>,
        return_to: Option<String>,
        pending: Option<PendingAuthorization>,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user,
            return_to,
            pending,
            created_at,
            expires_at,
        }
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn user(&self) -> Option<&serde_json::Value> {
        self.user.as_ref()
    }

    #[must_use]
    pub fn return_to(&self) -> Option<&str> {
        self.return_to.as_deref()
    }

    #[must_use]
    pub fn pending(&self) -> Option<&PendingAuthorization> {
        self.pending.as_ref()
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Returns true if the session has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Returns the gate's view of this session.
    #[must_use]
    pub fn state(&self, hooks: &ProfileHooks) -> SessionState {
        SessionState::restore(
            self.user.clone().map(hooks.deserialize),
            self.return_to.clone(),
        )
    }

    /// Writes the gate's view back into the record.
    pub fn store_state(&mut self, state: &SessionState, hooks: &ProfileHooks) {
        self.user = state.user().map(hooks.serialize);
        self.return_to = state.return_to().map(str::to_string);
    }

    /// Remembers the secrets of a login that is in flight.
    pub fn set_pending(&mut self, pending: PendingAuthorization) {
        self.pending = Some(pending);
    }

    /// Removes and returns the in-flight login secrets.
    pub fn take_pending(&mut self) -> Option<PendingAuthorization> {
        self.pending.take()
    }

    /// Moves the session to a fresh ID, returning the old one.
    ///
    /// Called when a login succeeds so an ID seen before authentication is
    /// never an authenticated one.
    pub fn rotate_id(&mut self) -> SessionId {
        std::mem::replace(&mut self.id, SessionId::new())
    }
}

/// Storage for session records, scoped per browser by session ID.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Finds a session by ID.
    async fn load(
        &self,
        id: &SessionId,
    ) -> Result<Option<SessionRecord>, SessionStoreError>;

    /// Creates or replaces a session.
    async fn save(&self, record: &SessionRecord) -> Result<(), SessionStoreError>;

    /// Deletes a session by ID.
    async fn delete(&self, id: &SessionId) -> Result<(), SessionStoreError>;

    /// Deletes expired sessions, returning how many were removed.
    async fn delete_expired(&self) -> Result<u64, SessionStoreError>;
}
