//! Chain health state machine. Derived purely from timestamps, so it's a
//! pure function rather than something with internal state transitions to
//! track — recomputed on every status refresh from the facts on hand.

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Health {
    Offline,
    Stale,
    Idle,
    Synced,
    Syncing,
}

pub const SYNCING_WINDOW: Duration = Duration::from_secs(60);
pub const SYNCED_WINDOW: Duration = Duration::from_secs(5 * 60);
pub const IDLE_WINDOW: Duration = Duration::from_secs(30 * 60);

/// Facts needed to compute health for one connection (or the aggregate
/// across all connections, using the most recent values).
#[derive(Debug, Clone, Copy)]
pub struct HealthInputs {
    pub peer_count: usize,
    pub since_last_file_transfer: Option<Duration>,
    pub since_last_manifest_exchange: Option<Duration>,
}

pub fn compute(inputs: HealthInputs) -> Health {
    if inputs.peer_count == 0 {
        return Health::Offline;
    }
    if let Some(since_transfer) = inputs.since_last_file_transfer {
        if since_transfer <= SYNCING_WINDOW {
            return Health::Syncing;
        }
    }
    match inputs.since_last_manifest_exchange {
        Some(since) if since <= SYNCED_WINDOW => Health::Synced,
        Some(since) if since <= IDLE_WINDOW => Health::Idle,
        _ => Health::Stale,
    }
}
