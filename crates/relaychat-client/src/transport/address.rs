//! Relay address validation (fail fast before any connection attempt).

use std::fmt;

use tokio_tungstenite::tungstenite::http::Uri;

use relaychat_core::error::{ChatError, Result};

/// A `ws://` or `wss://` address with a host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayAddress(String);

impl RelayAddress {
    pub fn parse(raw: Option<&str>) -> Result<Self> {
        let raw = raw.map(str::trim).filter(|s| !s.is_empty()).ok_or_else(|| {
            ChatError::InvalidConfiguration("relay address is not configured".into())
        })?;

        let uri: Uri = raw.parse().map_err(|e| {
            ChatError::InvalidConfiguration(format!("invalid relay address {raw:?}: {e}"))
        })?;

        match uri.scheme_str() {
            Some("ws") | Some("wss") => {}
            other => {
                return Err(ChatError::InvalidConfiguration(format!(
                    "relay address must use ws:// or wss://, got {:?}",
                    other.unwrap_or("")
                )))
            }
        }
        if uri.host().map_or(true, str::is_empty) {
            return Err(ChatError::InvalidConfiguration(format!(
                "relay address has no host: {raw:?}"
            )));
        }

        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RelayAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
