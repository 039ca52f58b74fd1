//! Shared value model, key helpers, and error types for the strata settings
//! engine.
//!
//! These types are kept apart from the engine so that hosts can name kinds,
//! values, and errors without depending on the blueprint and profile
//! machinery.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

pub mod error;
pub mod key;
pub mod prelude;
pub mod value;
pub mod version;

// vim: ts=4
