use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An opaque 32-byte peer identity. Only the first 8 hex characters are
/// ever shown in logs or status output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerId(pub [u8; 32]);

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0[..4] {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerStats {
    pub id: PeerId,
    pub connected_at: DateTime<Utc>,
    pub files_received: u64,
    pub files_sent: u64,
    pub last_sync: Option<DateTime<Utc>>,
    pub last_manifest_exchange: Option<DateTime<Utc>>,
}

impl PeerStats {
    pub fn new(id: PeerId) -> Self {
        Self {
            id,
            connected_at: Utc::now(),
            files_received: 0,
            files_sent: 0,
            last_sync: None,
            last_manifest_exchange: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_shows_only_first_eight_hex_chars() {
        let id = PeerId([0xab; 32]);
        assert_eq!(id.to_string(), "abababab");
        assert_eq!(id.to_string().len(), 8);
    }
}
