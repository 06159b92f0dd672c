//! Login gating for gatehouse.
//!
//! This crate provides:
//! - Settings resolution from built-in, environment and caller layers
//!   ([`resolve`])
//! - The per-request login gate ([`AuthGate`])
//! - The gate's view of a session ([`SessionState`])
//! - The identity provider seam ([`Strategy`])
//!
//! It knows nothing about HTTP, cookies or storage. The server crate wires it
//! into axum.
//!
//! # Example
//!
//! ```
//! use gatehouse_access::{
//!     AuthGate, AuthenticatedUser, Decision, ProviderOverrides, SessionState, Settings,
//!     SettingsOverrides, resolve,
//! };
//!
//! let settings = resolve(
//!     &Settings::builtin(),
//!     &ProviderOverrides::default(),
//!     &SettingsOverrides::default(),
//! );
//! let gate = AuthGate::new(settings);
//!
//! // An anonymous visitor asks for a protected page.
//! let mut session = SessionState::new();
//! let decision = gate.evaluate("/reports", &mut session);
//! assert_eq!(decision, Decision::RedirectToLogin("/login".to_string()));
//!
//! // The provider callback established a user.
//! session.establish(AuthenticatedUser::default());
//! let redirect = gate.complete_login(&mut session).unwrap();
//! assert_eq!(redirect.target(), "/reports");
//! ```

pub mod error;
pub mod gate;
pub mod session;
pub mod settings;
pub mod strategy;
pub mod user;

pub use error::{GateError, StrategyError};
pub use gate::{AuthGate, Decision, Redirect};
pub use session::SessionState;
pub use settings::{ProviderConfig, ProviderOverrides, Settings, SettingsOverrides, resolve};
pub use strategy::{Authorization, PendingAuthorization, Strategy};
pub use user::{AuthenticatedUser, ProfileHooks};
