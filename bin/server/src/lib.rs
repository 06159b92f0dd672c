//! gatehouse web server.
//!
//! Puts axum routes behind a login gate that authenticates users with an
//! OpenID Connect provider and keeps them in server-side sessions.

pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod sessions;
