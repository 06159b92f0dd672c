//! Core types shared by the gatehouse crates.
//!
//! This crate provides the session identifier type and the `Result` alias
//! used for layered error reporting.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{ParseIdError, SessionId};
