use relaychat_core::error::{ChatError, Result};
use relaychat_core::protocol::{AUTHOR_CLIENT_ID, AUTHOR_REQUEST_PURGE};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    pub version: u32,

    #[serde(default)]
    pub relay: RelaySection,

    #[serde(default)]
    pub session: SessionSection,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            version: 1,
            relay: RelaySection::default(),
            session: SessionSection::default(),
        }
    }
}

impl ClientConfig {
    /// Defaults pointed at `address`.
    pub fn with_address(address: impl Into<String>) -> Self {
        let mut cfg = Self::default();
        cfg.apply_relay_address(address);
        cfg
    }

    /// Blank values count as unset.
    pub fn apply_relay_address(&mut self, address: impl Into<String>) {
        let address = address.into();
        self.relay.address = if address.trim().is_empty() {
            None
        } else {
            Some(address)
        };
    }

    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(ChatError::InvalidConfiguration(format!(
                "unsupported config version {}",
                self.version
            )));
        }

        // The address itself is checked when a connection starts.
        self.relay.validate()?;
        self.session.validate()?;

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelaySection {
    #[serde(default)]
    pub address: Option<String>,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    #[serde(default = "default_outbound_queue")]
    pub outbound_queue: usize,
}

impl Default for RelaySection {
    fn default() -> Self {
        Self {
            address: None,
            connect_timeout_ms: default_connect_timeout_ms(),
            outbound_queue: default_outbound_queue(),
        }
    }
}

impl RelaySection {
    pub fn validate(&self) -> Result<()> {
        if !(1000..=60000).contains(&self.connect_timeout_ms) {
            return Err(ChatError::InvalidConfiguration(
                "relay.connect_timeout_ms must be between 1000 and 60000".into(),
            ));
        }
        if !(1..=65536).contains(&self.outbound_queue) {
            return Err(ChatError::InvalidConfiguration(
                "relay.outbound_queue must be between 1 and 65536".into(),
            ));
        }
        Ok(())
    }
}

fn default_connect_timeout_ms() -> u64 {
    10000
}
fn default_outbound_queue() -> usize {
    256
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionSection {
    /// Author label for local echoes.
    #[serde(default = "default_local_author")]
    pub local_author: String,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            local_author: default_local_author(),
        }
    }
}

impl SessionSection {
    pub fn validate(&self) -> Result<()> {
        if self.local_author.trim().is_empty() {
            return Err(ChatError::InvalidConfiguration(
                "session.local_author must not be empty".into(),
            ));
        }
        if [AUTHOR_CLIENT_ID, AUTHOR_REQUEST_PURGE].contains(&self.local_author.as_str()) {
            return Err(ChatError::InvalidConfiguration(format!(
                "session.local_author must not be a reserved author: {}",
                self.local_author
            )));
        }
        Ok(())
    }
}

fn default_local_author() -> String {
    "Me".into()
}
