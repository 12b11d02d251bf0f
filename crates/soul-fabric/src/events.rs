use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use soul_core::atomic::append;
use soul_core::error::Result;
use soul_core::jsonl::parse_lines;
use soul_core::SoulPath;

/// One line of `.soul-events/current.jsonl`. `ts` is the writer's wall
/// clock; no cross-process ordering is implied by it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    pub ts: DateTime<Utc>,
    #[serde(rename = "type")]
    pub event_type: String,
    pub source: String,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub data: serde_json::Value,
}

impl Event {
    pub fn new(event_type: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            ts: Utc::now(),
            event_type: event_type.into(),
            source: source.into(),
            data: serde_json::Value::Null,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }
}

pub fn append_event(soul: &SoulPath, event: &Event) -> Result<()> {
    let mut line = serde_json::to_vec(event)?;
    line.push(b'\n');
    append(&soul.events_current(), &line)
}

/// Read all well-formed events. Lines that fail to parse (including a
/// truncated trailing line from a concurrent writer) are silently
/// discarded, per the tolerant-read contract.
pub fn read_events(soul: &SoulPath) -> Result<Vec<Event>> {
    let content = match std::fs::read_to_string(soul.events_current()) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(soul_core::Error::transient(soul.events_current(), e)),
    };
    Ok(parse_lines::<Event>(&content).records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn appends_are_additive() {
        let dir = TempDir::new().unwrap();
        let soul = SoulPath::new(dir.path());
        append_event(&soul, &Event::new("wake", "guard")).unwrap();
        append_event(&soul, &Event::new("research", "agent")).unwrap();
        let events = read_events(&soul).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, "wake");
        assert_eq!(events[1].event_type, "research");
    }

    #[test]
    fn tolerates_truncated_trailing_line() {
        let dir = TempDir::new().unwrap();
        let soul = SoulPath::new(dir.path());
        std::fs::create_dir_all(soul.events_dir()).unwrap();
        std::fs::write(
            soul.events_current(),
            "{\"ts\":\"2025-01-01T00:00:00Z\",\"type\":\"wake\",\"source\":\"guard\"}\n{\"ts\":\"2025-0",
        )
        .unwrap();
        let events = read_events(&soul).unwrap();
        assert_eq!(events.len(), 1);
    }
}
