//! Merge rules. Most tracked files use last-writer-wins by mtime; files in
//! the merge set (`knowledge-graph.jsonl`) use an additive, line-based
//! union merge that never deletes an observation or relation.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use soul_core::jsonl::parse_lines;

/// Decide whether an inbound file should replace the local copy, for
/// non-merge-set files. `local_mtime`/`remote_mtime` are milliseconds since
/// epoch; ties resolve toward the local copy (see the open question on
/// same-mtime conflicts, resolved explicitly in favor of "local wins").
pub fn remote_wins(local_hash: &str, remote_hash: &str, local_mtime: i64, remote_mtime: i64) -> bool {
    if local_hash == remote_hash {
        return false;
    }
    remote_mtime > local_mtime
}

/// Clamp an inbound mtime so a peer with a skewed-ahead clock cannot
/// permanently win future conflicts: `min(now, mtime)`.
pub fn clamp_mtime(mtime_ms: i64, now_ms: i64) -> i64 {
    mtime_ms.min(now_ms)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KgRecord {
    Entity {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        #[serde(rename = "entityType")]
        entity_type: Option<String>,
        #[serde(default)]
        observations: Vec<String>,
    },
    Relation {
        from: String,
        to: String,
        #[serde(rename = "relationType")]
        relation_type: String,
    },
}

/// Merge two `knowledge-graph.jsonl` contents. Entities merge by `name`
/// with a deduplicated union of observations (`entityType` filled from
/// whichever side has it); relations merge by the `(from, to,
/// relationType)` triple and are deduplicated. Nothing present on either
/// side is ever dropped. Output order: entities first (in first-seen
/// order across local then remote), then relations, for a stable
/// re-serialization.
pub fn merge_knowledge_graph(local: &str, remote: &str) -> String {
    let local_records = parse_lines::<KgRecord>(local).records;
    let remote_records = parse_lines::<KgRecord>(remote).records;

    let mut entity_order: Vec<String> = Vec::new();
    let mut entities: std::collections::HashMap<String, (Option<String>, BTreeSet<String>)> =
        std::collections::HashMap::new();
    let mut relation_order: Vec<(String, String, String)> = Vec::new();
    let mut relations: BTreeSet<(String, String, String)> = BTreeSet::new();

    for record in local_records.into_iter().chain(remote_records) {
        match record {
            KgRecord::Entity {
                name,
                entity_type,
                observations,
            } => {
                let entry = entities.entry(name.clone()).or_insert_with(|| {
                    entity_order.push(name.clone());
                    (None, BTreeSet::new())
                });
                if entry.0.is_none() {
                    entry.0 = entity_type;
                }
                for obs in observations {
                    entry.1.insert(obs);
                }
            }
            KgRecord::Relation {
                from,
                to,
                relation_type,
            } => {
                let key = (from.clone(), to.clone(), relation_type.clone());
                if relations.insert(key.clone()) {
                    relation_order.push(key);
                }
            }
        }
    }

    let mut out_lines = Vec::new();
    for name in entity_order {
        let (entity_type, observations) = entities.remove(&name).unwrap();
        let record = KgRecord::Entity {
            name,
            entity_type,
            observations: observations.into_iter().collect(),
        };
        if let Ok(line) = serde_json::to_string(&record) {
            out_lines.push(line);
        }
    }
    for (from, to, relation_type) in relation_order {
        let record = KgRecord::Relation {
            from,
            to,
            relation_type,
        };
        if let Ok(line) = serde_json::to_string(&record) {
            out_lines.push(line);
        }
    }

    let mut joined = out_lines.join("\n");
    joined.push('\n');
    joined
}

/// Convenience accessor for a merged line's raw JSON value, used by
/// callers that only want to count records rather than reparse types.
pub fn count_records(content: &str) -> usize {
    parse_lines::<Value>(content).records.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_wins_on_strictly_newer_mtime() {
        assert!(remote_wins("a", "b", 100, 200));
        assert!(!remote_wins("a", "b", 200, 100));
    }

    #[test]
    fn local_wins_on_tie() {
        assert!(!remote_wins("a", "b", 100, 100));
    }

    #[test]
    fn identical_hash_never_triggers_a_write() {
        assert!(!remote_wins("same", "same", 0, 1_000_000));
    }

    #[test]
    fn clamp_mtime_never_exceeds_now() {
        assert_eq!(clamp_mtime(5000, 1000), 1000);
        assert_eq!(clamp_mtime(500, 1000), 500);
    }

    #[test]
    fn merges_entity_observations_and_relation_union() {
        let local = r#"{"type":"entity","name":"Alex","entityType":"person","observations":["likes tea"]}"#;
        let remote = "{\"type\":\"entity\",\"name\":\"Alex\",\"observations\":[\"lives in Berlin\"]}\n\
                       {\"type\":\"relation\",\"from\":\"Alex\",\"to\":\"Soul\",\"relationType\":\"creator_of\"}";

        let merged = merge_knowledge_graph(local, remote);
        let records = parse_lines::<KgRecord>(&merged).records;

        let entity = records
            .iter()
            .find_map(|r| match r {
                KgRecord::Entity { name, entity_type, observations } if name == "Alex" => {
                    Some((entity_type.clone(), observations.clone()))
                }
                _ => None,
            })
            .unwrap();
        assert_eq!(entity.0.as_deref(), Some("person"));
        assert!(entity.1.contains(&"likes tea".to_string()));
        assert!(entity.1.contains(&"lives in Berlin".to_string()));

        let has_relation = records.iter().any(|r| {
            matches!(r, KgRecord::Relation { from, to, relation_type }
                if from == "Alex" && to == "Soul" && relation_type == "creator_of")
        });
        assert!(has_relation);
    }

    #[test]
    fn merge_never_loses_observations_present_on_either_side() {
        let local = r#"{"type":"entity","name":"X","observations":["a","b"]}"#;
        let remote = r#"{"type":"entity","name":"X","observations":["b","c"]}"#;
        let merged = merge_knowledge_graph(local, remote);
        let records = parse_lines::<KgRecord>(&merged).records;
        let KgRecord::Entity { observations, .. } = &records[0] else {
            panic!("expected entity");
        };
        let set: BTreeSet<_> = observations.iter().cloned().collect();
        assert_eq!(set, BTreeSet::from(["a".to_string(), "b".to_string(), "c".to_string()]));
    }

    #[test]
    fn duplicate_relations_are_deduplicated() {
        let local = r#"{"type":"relation","from":"A","to":"B","relationType":"knows"}"#;
        let remote = r#"{"type":"relation","from":"A","to":"B","relationType":"knows"}"#;
        let merged = merge_knowledge_graph(local, remote);
        assert_eq!(count_records(&merged), 1);
    }
}
