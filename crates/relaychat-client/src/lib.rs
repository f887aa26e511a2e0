//! relaychat client library.
//!
//! Wires config, the connection controller and session state into a
//! `ChatSession` that frontends own. Consumed by the terminal binary
//! (`main.rs`) and by integration tests.

pub mod config;
pub mod session;
pub mod transport;

pub use session::{ChatSession, ConnectionStatus, LogEntry, SessionEvent, SessionState};
