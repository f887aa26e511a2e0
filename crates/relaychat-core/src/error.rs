//! Shared error type across relaychat crates.

use thiserror::Error;

/// Stable error codes (used in logs and test vectors).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Inbound payload is not a valid envelope.
    MalformedFrame,
    /// Connection closed by the relay or locally.
    TransportClosed,
    /// Connection failed (connect error, I/O error, timeout).
    TransportError,
    /// Missing or invalid configuration.
    InvalidConfiguration,
    /// Outbound frame attempted without a usable connection.
    SendWhileDisconnected,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::MalformedFrame => "MALFORMED_FRAME",
            ErrorCode::TransportClosed => "TRANSPORT_CLOSED",
            ErrorCode::TransportError => "TRANSPORT_ERROR",
            ErrorCode::InvalidConfiguration => "INVALID_CONFIGURATION",
            ErrorCode::SendWhileDisconnected => "SEND_WHILE_DISCONNECTED",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, ChatError>;

/// Unified error type used by the protocol and the client.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("malformed frame: {0}")]
    MalformedFrame(String),
    #[error("transport closed")]
    TransportClosed,
    #[error("transport error: {0}")]
    TransportError(String),
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("send while disconnected")]
    SendWhileDisconnected,
}

impl ChatError {
    /// Map to a stable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            ChatError::MalformedFrame(_) => ErrorCode::MalformedFrame,
            ChatError::TransportClosed => ErrorCode::TransportClosed,
            ChatError::TransportError(_) => ErrorCode::TransportError,
            ChatError::InvalidConfiguration(_) => ErrorCode::InvalidConfiguration,
            ChatError::SendWhileDisconnected => ErrorCode::SendWhileDisconnected,
        }
    }
}
