//! Chat session: mutable state plus the owner object that drives it.

pub mod chat;
pub mod state;

pub use chat::{ChatSession, SessionEvent};
pub use state::{ConnectionStatus, LogEntry, SessionState};
