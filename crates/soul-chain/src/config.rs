//! Peer Chain daemon configuration, loaded from `.soul-chain` (TOML) inside
//! the soul directory. Every field has a sane default so a daemon can start
//! against a soul directory that has never been configured.

use serde::{Deserialize, Serialize};
use soul_core::error::{Error, Result};
use soul_core::SoulPath;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    pub listen_port: u16,
    pub manifest_poll_ms: u64,
    pub status_refresh_ms: u64,
    pub max_in_flight_per_peer: usize,
    pub connect_timeout_ms: u64,
    /// `host:port` of peers to dial on startup, in addition to whatever
    /// connects inbound. Populated by `join` or hand-edited after pairing
    /// a new device out of band.
    pub peers: Vec<String>,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            listen_port: 47_101,
            manifest_poll_ms: 5_000,
            status_refresh_ms: 30_000,
            max_in_flight_per_peer: 64,
            connect_timeout_ms: 60_000,
            peers: Vec::new(),
        }
    }
}

impl ChainConfig {
    pub fn load(soul: &SoulPath) -> Result<Self> {
        match std::fs::read_to_string(soul.chain_config()) {
            Ok(content) => toml::from_str(&content)
                .map_err(|e| Error::Config(format!("invalid .soul-chain: {e}"))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(Error::transient(soul.chain_config(), e)),
        }
    }

    pub fn save(&self, soul: &SoulPath) -> Result<()> {
        let body = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("failed to serialize .soul-chain: {e}")))?;
        soul_core::atomic::write_atomic(&soul.chain_config(), body.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_config_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let soul = SoulPath::new(dir.path());
        let config = ChainConfig::load(&soul).unwrap();
        assert_eq!(config.listen_port, 47_101);
        assert_eq!(config.max_in_flight_per_peer, 64);
    }

    #[test]
    fn round_trips_through_disk() {
        let dir = TempDir::new().unwrap();
        let soul = SoulPath::new(dir.path());
        let mut config = ChainConfig::default();
        config.listen_port = 9999;
        config.save(&soul).unwrap();

        let loaded = ChainConfig::load(&soul).unwrap();
        assert_eq!(loaded.listen_port, 9999);
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let dir = TempDir::new().unwrap();
        let soul = SoulPath::new(dir.path());
        std::fs::write(soul.chain_config(), "listen_port = 1234\n").unwrap();
        let config = ChainConfig::load(&soul).unwrap();
        assert_eq!(config.listen_port, 1234);
        assert_eq!(config.manifest_poll_ms, 5_000);
    }
}
