use std::fs;

use serde::{Deserialize, Serialize};
use soul_core::atomic::write_atomic;
use soul_core::error::Result;
use soul_core::SoulPath;

/// One observation on `.soul-pulse`. Accepts either the plain `type:label`
/// form or a JSON object; both round-trip through this struct.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Pulse {
    pub activity: String,
    pub label: String,
}

impl Pulse {
    pub fn new(activity: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            activity: activity.into(),
            label: label.into(),
        }
    }
}

/// Write a pulse observation, overwriting whatever was there (last-write-wins).
pub fn write_pulse(soul: &SoulPath, pulse: &Pulse) -> Result<()> {
    let body = serde_json::to_vec(pulse)?;
    write_atomic(&soul.pulse_file(), &body)
}

/// Parse pulse file contents. Tries JSON first; on failure, falls back to
/// splitting on the first `:` so a bare `type:label` line still parses.
pub fn parse_pulse(content: &str) -> Option<Pulse> {
    let content = content.trim();
    if content.is_empty() {
        return None;
    }
    if let Ok(pulse) = serde_json::from_str::<Pulse>(content) {
        return Some(pulse);
    }
    content.split_once(':').map(|(activity, label)| Pulse {
        activity: activity.trim().to_string(),
        label: label.trim().to_string(),
    })
}

pub fn read_pulse(soul: &SoulPath) -> Result<Option<Pulse>> {
    match fs::read_to_string(soul.pulse_file()) {
        Ok(content) => Ok(parse_pulse(&content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(soul_core::Error::transient(soul.pulse_file(), e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn round_trips_through_json() {
        let dir = TempDir::new().unwrap();
        let soul = SoulPath::new(dir.path());
        write_pulse(&soul, &Pulse::new("research", "reading docs")).unwrap();
        let pulse = read_pulse(&soul).unwrap().unwrap();
        assert_eq!(pulse.activity, "research");
        assert_eq!(pulse.label, "reading docs");
    }

    #[test]
    fn parses_plain_type_label_form() {
        let pulse = parse_pulse("code:refactoring parser").unwrap();
        assert_eq!(pulse.activity, "code");
        assert_eq!(pulse.label, "refactoring parser");
    }

    #[test]
    fn parses_json_form() {
        let pulse = parse_pulse(r#"{"activity":"dream","label":"wandering"}"#).unwrap();
        assert_eq!(pulse.activity, "dream");
    }

    #[test]
    fn missing_file_is_none_not_error() {
        let dir = TempDir::new().unwrap();
        let soul = SoulPath::new(dir.path());
        assert!(read_pulse(&soul).unwrap().is_none());
    }
}
