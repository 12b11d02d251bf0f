use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use soul_core::atomic::write_atomic;
use soul_core::error::Result;
use soul_core::SoulPath;

use crate::health::Health;
use crate::peer::PeerStats;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerStatusEntry {
    pub id: String,
    #[serde(rename = "connectedAt")]
    pub connected_at: DateTime<Utc>,
    #[serde(rename = "filesReceived")]
    pub files_received: u64,
    #[serde(rename = "filesSent")]
    pub files_sent: u64,
    #[serde(rename = "lastSync")]
    pub last_sync: Option<DateTime<Utc>>,
    #[serde(rename = "lastManifestExchange")]
    pub last_manifest_exchange: Option<DateTime<Utc>>,
}

impl From<&PeerStats> for PeerStatusEntry {
    fn from(stats: &PeerStats) -> Self {
        Self {
            id: stats.id.to_string(),
            connected_at: stats.connected_at,
            files_received: stats.files_received,
            files_sent: stats.files_sent,
            last_sync: stats.last_sync,
            last_manifest_exchange: stats.last_manifest_exchange,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainStatus {
    pub active: bool,
    pub health: Health,
    pub peers: Vec<PeerStatusEntry>,
    #[serde(rename = "totalSynced")]
    pub total_synced: u64,
    pub since: DateTime<Utc>,
    #[serde(rename = "lastUpdate")]
    pub last_update: DateTime<Utc>,
}

impl ChainStatus {
    pub fn new(since: DateTime<Utc>) -> Self {
        Self {
            active: true,
            health: Health::Offline,
            peers: Vec::new(),
            total_synced: 0,
            since,
            last_update: Utc::now(),
        }
    }
}

pub fn write_status(soul: &SoulPath, status: &ChainStatus) -> Result<()> {
    let body = serde_json::to_vec_pretty(status)?;
    write_atomic(&soul.chain_status(), &body)
}

pub fn read_status(soul: &SoulPath) -> Result<Option<ChainStatus>> {
    match std::fs::read_to_string(soul.chain_status()) {
        Ok(content) => Ok(serde_json::from_str(&content).ok()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(soul_core::Error::transient(soul.chain_status(), e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn status_round_trips_through_disk() {
        let dir = TempDir::new().unwrap();
        let soul = SoulPath::new(dir.path());
        let mut status = ChainStatus::new(Utc::now());
        status.health = Health::Synced;
        status.total_synced = 3;
        write_status(&soul, &status).unwrap();

        let read_back = read_status(&soul).unwrap().unwrap();
        assert_eq!(read_back.total_synced, 3);
        assert_eq!(read_back.health, Health::Synced);
    }

    #[test]
    fn missing_status_file_is_none() {
        let dir = TempDir::new().unwrap();
        let soul = SoulPath::new(dir.path());
        assert!(read_status(&soul).unwrap().is_none());
    }
}
