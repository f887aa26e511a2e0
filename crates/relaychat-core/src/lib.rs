//! relaychat core: transport-agnostic protocol primitives and error types.
//!
//! This crate defines the envelope wire contract and the error surface shared by
//! the client and its frontends. It carries no transport or runtime
//! dependencies so the codec stays a set of pure functions.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Malformed relay traffic must surface as `ChatError::MalformedFrame` so a bad
//! frame can be dropped without taking the session down.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod protocol;

/// Shared result type.
pub use error::{ChatError, ErrorCode, Result};
