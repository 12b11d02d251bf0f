use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tunables for the Session Guard: a `#[serde(default)]` struct with an
/// explicit (not derived) `Default` impl carrying real tuned values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Phrases that, if they end the agent's last message, trigger the
    /// goodbye block while a session is active. Matched case-insensitively
    /// against the trimmed tail of the message.
    pub goodbye_phrases: Vec<String>,
    /// Budget for the LLM-assisted STATE/MEM blocks during Phase B.
    pub consolidation_timeout_ms: u64,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            // English and German closings observed across founding
            // interviews; locale-specific lists can be supplied by
            // deployments with other target languages.
            goodbye_phrases: vec![
                "goodbye".to_string(),
                "good night".to_string(),
                "see you tomorrow".to_string(),
                "bis morgen".to_string(),
                "gute nacht".to_string(),
                "auf wiedersehen".to_string(),
            ],
            consolidation_timeout_ms: 30_000,
        }
    }
}

impl GuardConfig {
    pub fn consolidation_timeout(&self) -> Duration {
        Duration::from_millis(self.consolidation_timeout_ms)
    }
}
