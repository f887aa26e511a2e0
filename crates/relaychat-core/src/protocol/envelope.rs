//! Envelope (JSON text frame).

use serde::Deserialize;
use serde_json::json;

/// Relay -> client identity assignment.
pub const AUTHOR_CLIENT_ID: &str = "server-clientid";
/// Purge request (client -> relay) or purge broadcast (relay -> client).
pub const AUTHOR_REQUEST_PURGE: &str = "request-purge";

/// Wire unit exchanged in both directions.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Envelope {
    /// Message body, or the identity value for `server-clientid`.
    pub content: String,
    /// Sender identity / display name, or a sentinel.
    pub author: String,
}

impl Envelope {
    pub fn new(content: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            author: author.into(),
        }
    }

    /// Purge request as sent by a client.
    pub fn purge_request() -> Self {
        Self::new("", AUTHOR_REQUEST_PURGE)
    }

    /// Serialize to a JSON text frame.
    pub fn to_wire(&self) -> String {
        json!({
            "content": self.content,
            "author": self.author,
        })
        .to_string()
    }
}
