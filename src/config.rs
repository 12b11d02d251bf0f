//! Top-level soul configuration, loaded from `.soul-config.toml` at the
//! root of the soul directory. Nests each crate's own config rather than
//! flattening, so a library crate's defaults stay that crate's problem;
//! this just wires them together for `soul-faculties`, using nested
//! `#[serde(default)]` structs plus an explicit `Default` impl.
//!
//! The Peer Chain daemon (`soul-chaind`) is a separate process with its
//! own config file, `.soul-chain` (`soul_chain::ChainConfig`) — it is not
//! nested here.

use std::path::Path;

use serde::{Deserialize, Serialize};
use soul_guard::GuardConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SoulConfig {
    pub guard: GuardConfig,
    pub fabric: FabricConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FabricConfig {
    /// Fabric watcher poll interval, in milliseconds.
    pub watcher_poll_ms: u64,
    /// Heartbeat-triggered consolidation cadence, in milliseconds.
    pub consolidation_interval_ms: u64,
}

impl Default for FabricConfig {
    fn default() -> Self {
        Self {
            watcher_poll_ms: 200,
            consolidation_interval_ms: 15 * 60 * 1000,
        }
    }
}

impl Default for SoulConfig {
    fn default() -> Self {
        Self {
            guard: GuardConfig::default(),
            fabric: FabricConfig::default(),
        }
    }
}

impl SoulConfig {
    /// Load config from TOML, falling back to defaults on missing or
    /// malformed file (never aborts startup over a bad config file, only
    /// over a missing soul directory).
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => {
                    tracing::info!(path = %path.display(), "loaded soul config");
                    config
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to parse soul config, using defaults");
                    Self::default()
                }
            },
            Err(_) => {
                tracing::info!(path = %path.display(), "no soul config found, using defaults");
                Self::default()
            }
        }
    }

    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let config = SoulConfig::load(Path::new("/nonexistent/.soul-config.toml"));
        assert_eq!(config.fabric.watcher_poll_ms, 200);
    }

    #[test]
    fn round_trips_through_toml() {
        let config = SoulConfig::default();
        let toml_body = config.to_toml();
        let parsed: SoulConfig = toml::from_str(&toml_body).unwrap();
        assert_eq!(
            parsed.fabric.consolidation_interval_ms,
            config.fabric.consolidation_interval_ms
        );
    }
}
