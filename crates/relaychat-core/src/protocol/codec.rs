//! Encode / decode / classify.

use crate::error::{ChatError, Result};

use super::envelope::{Envelope, AUTHOR_CLIENT_ID, AUTHOR_REQUEST_PURGE};

/// Semantic category of a decoded envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// New identity for this connection.
    IdentityAssignment(String),
    /// Clear the shared log.
    PurgeNotice,
    /// Displayable chat line.
    ChatMessage(Envelope),
}

/// Encode a chat line sent under `identity`.
pub fn encode(content: &str, identity: &str) -> String {
    Envelope::new(content, identity).to_wire()
}

/// Decode a text frame.
pub fn decode(wire: &str) -> Result<Envelope> {
    serde_json::from_str(wire)
        .map_err(|e| ChatError::MalformedFrame(format!("invalid envelope json: {e}")))
}

/// Decode a binary frame; the payload must still be UTF-8 JSON.
pub fn decode_bytes(wire: &[u8]) -> Result<Envelope> {
    let s = std::str::from_utf8(wire)
        .map_err(|e| ChatError::MalformedFrame(format!("utf8 invalid: {e}")))?;
    decode(s)
}

/// Classify an envelope. Total: sentinel authors win over display names, so a
/// user literally named `server-clientid` cannot be told apart from the relay.
pub fn classify(env: Envelope) -> Frame {
    match env.author.as_str() {
        AUTHOR_CLIENT_ID => Frame::IdentityAssignment(env.content),
        AUTHOR_REQUEST_PURGE => Frame::PurgeNotice,
        _ => Frame::ChatMessage(env),
    }
}
