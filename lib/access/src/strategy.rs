//! The credential-exchange seam.
//!
//! A [`Strategy`] talks to the identity provider. The gate never calls it
//! directly; the login route does, and feeds the outcome to
//! [`AuthGate::complete_login`](crate::AuthGate::complete_login) or
//! [`AuthGate::fail_login`](crate::AuthGate::fail_login).

use crate::error::StrategyError;
use crate::user::AuthenticatedUser;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

/// Secrets generated when a login starts, kept in the session until the
/// provider calls back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAuthorization {
    pub csrf_token: String,
    pub pkce_verifier: String,
    pub nonce: String,
}

impl PendingAuthorization {
    /// Checks the `state` parameter the provider echoed back, in constant time.
    pub fn verify_state(&self, state: &str) -> Result<(), StrategyError> {
        let matches: bool = self.csrf_token.as_bytes().ct_eq(state.as_bytes()).into();
        if matches {
            Ok(())
        } else {
            Err(StrategyError::CsrfMismatch)
        }
    }
}

/// Where to send the user to authenticate, and what to remember meanwhile.
#[derive(Debug, Clone)]
pub struct Authorization {
    pub url: String,
    pub pending: PendingAuthorization,
}

/// Identity provider integration.
#[async_trait]
pub trait Strategy: Send + Sync {
    /// Starts a login round trip.
    fn begin(&self) -> Result<Authorization, StrategyError>;

    /// Exchanges the authorization code for the user's profile.
    async fn exchange(
        &self,
        code: &str,
        pending: &PendingAuthorization,
    ) -> Result<AuthenticatedUser, StrategyError>;
}
