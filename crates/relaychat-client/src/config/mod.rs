//! Client config loader (strict parsing).

pub mod schema;

use std::fs;
use std::path::Path;

use relaychat_core::error::{ChatError, Result};

pub use schema::{ClientConfig, RelaySection, SessionSection};

/// Config file path override.
pub const ENV_CONFIG_PATH: &str = "RELAYCHAT_CONFIG";
/// Relay address override.
pub const ENV_RELAY_ADDRESS: &str = "RELAYCHAT_RELAY_ADDRESS";

const DEFAULT_CONFIG_PATH: &str = "relaychat.yaml";

pub fn load_from_file(path: impl AsRef<Path>) -> Result<ClientConfig> {
    let path = path.as_ref();
    let s = fs::read_to_string(path).map_err(|e| {
        ChatError::InvalidConfiguration(format!("read config {} failed: {e}", path.display()))
    })?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<ClientConfig> {
    let cfg: ClientConfig = serde_yaml::from_str(s)
        .map_err(|e| ChatError::InvalidConfiguration(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Resolve the runtime config: file (if present) then environment overrides.
///
/// A missing default file is not an error; an explicitly named one is.
pub fn load() -> Result<ClientConfig> {
    let mut cfg = match std::env::var(ENV_CONFIG_PATH) {
        Ok(path) => load_from_file(path)?,
        Err(_) if Path::new(DEFAULT_CONFIG_PATH).exists() => load_from_file(DEFAULT_CONFIG_PATH)?,
        Err(_) => ClientConfig::default(),
    };
    if let Ok(address) = std::env::var(ENV_RELAY_ADDRESS) {
        cfg.apply_relay_address(address);
    }
    Ok(cfg)
}
