use std::fs;

use chrono::{DateTime, Utc};
use soul_core::atomic::write_atomic;
use soul_core::error::Result;
use soul_core::SoulPath;

/// `.session-active`'s contents: presence of the file is the signal, but it
/// carries the session number and start time so a crash-recovery reader
/// knows which session it's recovering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionMarker {
    pub session: u32,
    pub start: DateTime<Utc>,
}

impl SessionMarker {
    pub fn new(session: u32) -> Self {
        Self {
            session,
            start: Utc::now(),
        }
    }

    fn render(&self) -> String {
        format!("session:{}\nstart:{}\n", self.session, self.start.to_rfc3339())
    }

    fn parse(content: &str) -> Option<Self> {
        let mut session = None;
        let mut start = None;
        for line in content.lines() {
            if let Some(rest) = line.strip_prefix("session:") {
                session = rest.trim().parse().ok();
            } else if let Some(rest) = line.strip_prefix("start:") {
                start = DateTime::parse_from_rfc3339(rest.trim())
                    .ok()
                    .map(|d| d.with_timezone(&Utc));
            }
        }
        Some(Self {
            session: session?,
            start: start?,
        })
    }
}

pub fn create_session_marker(soul: &SoulPath, marker: &SessionMarker) -> Result<()> {
    write_atomic(&soul.session_active(), marker.render().as_bytes())
}

pub fn read_session_marker(soul: &SoulPath) -> Result<Option<SessionMarker>> {
    match fs::read_to_string(soul.session_active()) {
        Ok(content) => Ok(SessionMarker::parse(&content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(soul_core::Error::transient(soul.session_active(), e)),
    }
}

pub fn delete_session_marker(soul: &SoulPath) -> Result<()> {
    match fs::remove_file(soul.session_active()) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(soul_core::Error::transient(soul.session_active(), e)),
    }
}

pub fn session_is_active(soul: &SoulPath) -> bool {
    soul.session_active().exists()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn create_read_delete_round_trip() {
        let dir = TempDir::new().unwrap();
        let soul = SoulPath::new(dir.path());
        assert!(!session_is_active(&soul));

        create_session_marker(&soul, &SessionMarker::new(3)).unwrap();
        assert!(session_is_active(&soul));
        let marker = read_session_marker(&soul).unwrap().unwrap();
        assert_eq!(marker.session, 3);

        delete_session_marker(&soul).unwrap();
        assert!(!session_is_active(&soul));
    }

    #[test]
    fn delete_on_absent_marker_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let soul = SoulPath::new(dir.path());
        delete_session_marker(&soul).unwrap();
    }
}
