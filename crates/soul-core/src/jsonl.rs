//! Tolerant per-line JSON parsing, shared by every append-only log in the
//! tree (`knowledge-graph.jsonl`, `.soul-events/current.jsonl`).
//!
//! Mirrors the line-by-line "collect successes and line-numbered errors,
//! never abort" parser used for session transcripts elsewhere in this
//! workspace: a bad or partial trailing line must not hide the records
//! before it.

use serde::de::DeserializeOwned;

pub struct LineParseError {
    pub line: usize,
    pub message: String,
}

pub struct LineParseResult<T> {
    pub records: Vec<T>,
    pub errors: Vec<LineParseError>,
}

/// Parse `content` as newline-delimited JSON of `T`. Blank lines are
/// skipped. A record that fails to parse is recorded in `errors` by its
/// 1-based line number and parsing continues; this is how a reader
/// tolerates a partially-written trailing line left by a concurrent
/// appender.
pub fn parse_lines<T: DeserializeOwned>(content: &str) -> LineParseResult<T> {
    let mut records = Vec::new();
    let mut errors = Vec::new();

    for (i, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<T>(line) {
            Ok(record) => records.push(record),
            Err(e) => errors.push(LineParseError {
                line: i + 1,
                message: e.to_string(),
            }),
        }
    }

    LineParseResult { records, errors }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Row {
        a: u32,
    }

    #[test]
    fn skips_blank_lines_and_collects_errors() {
        let input = "{\"a\":1}\n\n{\"a\":2}\nnot json\n";
        let result: LineParseResult<Row> = parse_lines(input);
        assert_eq!(result.records, vec![Row { a: 1 }, Row { a: 2 }]);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].line, 4);
    }

    #[test]
    fn discards_unparseable_trailing_partial_line() {
        let input = "{\"a\":1}\n{\"a\":2";
        let result: LineParseResult<Row> = parse_lines(input);
        assert_eq!(result.records, vec![Row { a: 1 }]);
        assert_eq!(result.errors.len(), 1);
    }
}
