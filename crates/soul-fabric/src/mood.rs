use std::fs;

use serde::{Deserialize, Serialize};
use soul_core::atomic::write_atomic;
use soul_core::error::Result;
use soul_core::SoulPath;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Mood {
    pub valence: f64,
    pub energy: f64,
    pub label: String,
}

impl Mood {
    pub fn new(valence: f64, energy: f64, label: impl Into<String>) -> Self {
        Self {
            valence: valence.clamp(-1.0, 1.0),
            energy: energy.clamp(0.0, 1.0),
            label: label.into(),
        }
    }
}

pub fn write_mood(soul: &SoulPath, mood: &Mood) -> Result<()> {
    let body = serde_json::to_vec(mood)?;
    write_atomic(&soul.mood_file(), &body)
}

pub fn read_mood(soul: &SoulPath) -> Result<Option<Mood>> {
    match fs::read_to_string(soul.mood_file()) {
        Ok(content) if content.trim().is_empty() => Ok(None),
        Ok(content) => Ok(serde_json::from_str(&content).ok()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(soul_core::Error::transient(soul.mood_file(), e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn clamps_out_of_range_values() {
        let mood = Mood::new(5.0, -5.0, "intense");
        assert_eq!(mood.valence, 1.0);
        assert_eq!(mood.energy, 0.0);
    }

    #[test]
    fn round_trips() {
        let dir = TempDir::new().unwrap();
        let soul = SoulPath::new(dir.path());
        write_mood(&soul, &Mood::new(0.2, 0.6, "curious")).unwrap();
        let mood = read_mood(&soul).unwrap().unwrap();
        assert_eq!(mood.label, "curious");
    }
}
