//! The gate's view of a single browser session.
//!
//! A session store owns persistence; the gate only reads and writes the two
//! facts kept here: who (if anyone) is signed in, and where the user was
//! headed when the gate last turned them away.

use crate::user::AuthenticatedUser;

/// Per-session login state.
///
/// Sessions start anonymous. The capture is written by
/// [`AuthGate::evaluate`](crate::AuthGate::evaluate) and consumed by
/// [`AuthGate::complete_login`](crate::AuthGate::complete_login).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    user: Option<AuthenticatedUser>,
    return_to: Option<String>,
}

impl SessionState {
    /// Creates an anonymous session with nothing captured.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a session from what a store persisted.
    #[must_use]
    pub fn restore(user: Option<AuthenticatedUser>, return_to: Option<String>) -> Self {
        Self { user, return_to }
    }

    /// Returns true once a strategy has established a user.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Returns the signed-in user, if any.
    #[must_use]
    pub fn user(&self) -> Option<&AuthenticatedUser> {
        self.user.as_ref()
    }

    /// Returns the captured return URL, if any.
    #[must_use]
    pub fn return_to(&self) -> Option<&str> {
        self.return_to.as_deref()
    }

    /// Attaches the user produced by a successful credential exchange.
    ///
    /// This is the only way a session becomes authenticated. The login
    /// callback calls it before handing the session to `complete_login`.
    pub fn establish(&mut self, user: AuthenticatedUser) {
        self.user = Some(user);
    }

    /// Detaches the user, returning the session to the anonymous state.
    pub fn sign_out(&mut self) -> Option<AuthenticatedUser> {
        self.user.take()
    }

    pub(crate) fn capture(&mut self, path: &str) {
        self.return_to = Some(path.to_string());
    }

    pub(crate) fn take_return_to(&mut self) -> Option<String> {
        self.return_to.take()
    }
}
