//! The login gate.
//!
//! Per session the gate moves through three states:
//!
//! ```text
//! Anonymous --evaluate (denied)--> PendingLogin(capture)
//! PendingLogin --strategy succeeds, complete_login--> Authenticated
//! PendingLogin --strategy fails, fail_login--> Anonymous (capture kept)
//! Authenticated --logout--> Anonymous
//! ```
//!
//! The gate itself holds no per-session state. All mutation happens on the
//! [`SessionState`] passed in, so one gate is shared by every request.

use crate::error::GateError;
use crate::session::SessionState;
use crate::settings::Settings;
use crate::user::ProfileHooks;
use std::sync::Arc;
use tracing::debug;

/// What to do with a request aimed at a protected route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// The session is authenticated; forward the request unchanged.
    PassThrough,
    /// Send the user to the login path. The original path has been captured.
    RedirectToLogin(String),
}

/// Redirect issued at the end of a login callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    target: String,
}

impl Redirect {
    fn to(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }

    /// Returns the redirect target.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Consumes the redirect, returning its target.
    #[must_use]
    pub fn into_target(self) -> String {
        self.target
    }
}

/// Decides, per request, whether to pass through or send the user to log in,
/// and where to land them once they have.
#[derive(Debug, Clone)]
pub struct AuthGate {
    settings: Arc<Settings>,
    hooks: ProfileHooks,
}

impl AuthGate {
    /// Creates a gate with identity profile hooks.
    #[must_use]
    pub fn new(settings: Settings) -> Self {
        Self::with_hooks(settings, ProfileHooks::default())
    }

    /// Creates a gate with custom profile hooks.
    #[must_use]
    pub fn with_hooks(settings: Settings, hooks: ProfileHooks) -> Self {
        Self {
            settings: Arc::new(settings),
            hooks,
        }
    }

    /// Returns the resolved settings.
    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Returns the profile hooks.
    #[must_use]
    pub fn hooks(&self) -> &ProfileHooks {
        &self.hooks
    }

    /// Classifies a request for `original_path`.
    ///
    /// Authenticated sessions pass through untouched. Anything else has
    /// `original_path` captured, replacing any earlier capture, and is sent to
    /// the login path.
    pub fn evaluate(&self, original_path: &str, session: &mut SessionState) -> Decision {
        if session.is_authenticated() {
            return Decision::PassThrough;
        }

        session.capture(original_path);
        debug!(
            path = original_path,
            login_path = %self.settings.login_path,
            "unauthenticated request, redirecting to login"
        );

        Decision::RedirectToLogin(self.settings.login_path.clone())
    }

    /// Finishes a successful login.
    ///
    /// Must run after the strategy has established a user on the session.
    /// The capture is cleared whether or not it is used, so calling this twice
    /// lands on the default return path the second time.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::MissingUser`] if the session has no user.
    pub fn complete_login(&self, session: &mut SessionState) -> Result<Redirect, GateError> {
        if !session.is_authenticated() {
            return Err(GateError::MissingUser);
        }

        let target = session
            .take_return_to()
            .filter(|captured| !captured.is_empty())
            .unwrap_or_else(|| self.settings.default_return_path.clone());

        debug!(target = %target, "login complete");

        Ok(Redirect::to(target))
    }

    /// Handles a failed credential exchange.
    ///
    /// The capture is left in place so a retry from the same page still
    /// returns there.
    pub fn fail_login(&self, _session: &SessionState) -> Redirect {
        let target = self.settings.failure_path();
        debug!(target = %target, "login failed");
        Redirect::to(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{ProviderOverrides, SettingsOverrides, resolve};
    use crate::user::AuthenticatedUser;
    use serde_json::json;
    use std::sync::Mutex;

    fn gate() -> AuthGate {
        let overrides = SettingsOverrides {
            failure_path: Some("/login-failed".to_string()),
            default_return_path: Some("/home".to_string()),
            ..Default::default()
        };
        AuthGate::new(resolve(
            &Settings::builtin(),
            &ProviderOverrides::default(),
            &overrides,
        ))
    }

    fn user() -> AuthenticatedUser {
        AuthenticatedUser::from_value(json!({
            "sub": "auth0|123",
            "name": "Alice",
        }))
    }

    fn authenticated() -> SessionState {
        let mut session = SessionState::new();
        session.establish(user());
        session
    }

    #[test]
    fn authenticated_session_passes_through_without_writes() {
        let gate = gate();
        let mut session = authenticated();
        let before = session.clone();

        let decision = gate.evaluate("/secret", &mut session);

        assert_eq!(decision, Decision::PassThrough);
        assert_eq!(session, before);
    }

    #[test]
    fn anonymous_session_is_redirected_and_captured() {
        let gate = gate();
        let mut session = SessionState::new();

        let decision = gate.evaluate("/secret", &mut session);

        assert_eq!(decision, Decision::RedirectToLogin("/login".to_string()));
        assert!(!session.is_authenticated());
        assert_eq!(session.return_to(), Some("/secret"));
    }

    #[test]
    fn last_denied_request_wins() {
        let gate = gate();
        let mut session = SessionState::new();

        gate.evaluate("/first", &mut session);
        gate.evaluate("/second?tab=2", &mut session);

        assert_eq!(session.return_to(), Some("/second?tab=2"));
    }

    #[test]
    fn completing_login_returns_to_captured_path() {
        let gate = gate();
        let mut session = SessionState::new();
        gate.evaluate("/secret", &mut session);
        session.establish(user());

        let redirect = gate.complete_login(&mut session).expect("user is present");

        assert_eq!(redirect.target(), "/secret");
        assert_eq!(session.return_to(), None);
    }

    #[test]
    fn capture_is_consumed_once() {
        let gate = gate();
        let mut session = SessionState::restore(Some(user()), Some("/secret".to_string()));

        let first = gate.complete_login(&mut session).expect("user is present");
        let second = gate.complete_login(&mut session).expect("user is present");

        assert_eq!(first.target(), "/secret");
        assert_eq!(second.target(), "/home");
    }

    #[test]
    fn completing_without_capture_uses_default_return_path() {
        let gate = gate();
        let mut session = authenticated();

        let redirect = gate.complete_login(&mut session).expect("user is present");

        assert_eq!(redirect.target(), "/home");
    }

    #[test]
    fn empty_capture_uses_default_return_path() {
        let gate = gate();
        let mut session = SessionState::restore(Some(user()), Some(String::new()));

        let redirect = gate.complete_login(&mut session).expect("user is present");

        assert_eq!(redirect.target(), "/home");
        assert_eq!(session.return_to(), None);
    }

    #[test]
    fn completing_without_user_is_an_integration_error() {
        let gate = gate();
        let mut session = SessionState::restore(None, Some("/secret".to_string()));

        let err = gate
            .complete_login(&mut session)
            .expect_err("no user was established");

        assert_eq!(err, GateError::MissingUser);
    }

    #[test]
    fn failed_login_keeps_capture() {
        let gate = gate();
        let mut session = SessionState::new();
        gate.evaluate("/secret", &mut session);

        let redirect = gate.fail_login(&session);

        assert_eq!(redirect.target(), "/login-failed");
        assert_eq!(session.return_to(), Some("/secret"));
    }

    #[test]
    fn failed_login_defaults_to_login_path() {
        let gate = AuthGate::new(Settings::builtin());
        let session = SessionState::new();

        assert_eq!(gate.fail_login(&session).target(), "/login");
    }

    #[test]
    fn retry_after_failure_returns_to_original_page() {
        let gate = gate();
        let mut session = SessionState::new();
        gate.evaluate("/reports/42", &mut session);
        gate.fail_login(&session);

        session.establish(user());
        let redirect = gate.complete_login(&mut session).expect("user is present");

        assert_eq!(redirect.into_target(), "/reports/42");
    }

    #[test]
    fn gate_is_shared_across_threads() {
        let gate = Arc::new(gate());
        let shared = Mutex::new(SessionState::new());
        let paths = ["/a", "/b"];

        std::thread::scope(|scope| {
            for path in paths {
                let gate = Arc::clone(&gate);
                let shared = &shared;
                scope.spawn(move || {
                    let mut session = shared.lock().expect("lock poisoned").clone();
                    gate.evaluate(path, &mut session);
                    *shared.lock().expect("lock poisoned") = session;
                });
            }
        });

        let session = shared.into_inner().expect("lock poisoned");
        let captured = session.return_to().expect("one write landed");
        assert!(paths.contains(&captured));
    }

    #[test]
    fn sessions_do_not_share_captures() {
        let gate = gate();
        let mut alice = SessionState::new();
        let mut bob = authenticated();

        gate.evaluate("/alice-only", &mut alice);
        let redirect = gate.complete_login(&mut bob).expect("user is present");

        assert_eq!(redirect.target(), "/home");
        assert_eq!(alice.return_to(), Some("/alice-only"));
    }
}
