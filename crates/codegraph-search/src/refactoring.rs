//! Heuristic refactoring suggestions over complexity, clone density, and
//! coupling for a single file.

use codegraph_core::{Entity, GraphStore};
use serde::Serialize;

use crate::clone_detection::CloneCluster;
use crate::error::Result;

/// Complexity score above which an entity is flagged regardless of other
/// signals.
const HIGH_COMPLEXITY_THRESHOLD: u32 = 15;

/// Relationship degree above which an entity is considered tightly
/// coupled to the rest of the graph.
const HIGH_COUPLING_THRESHOLD: i64 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Complexity,
    Clones,
    Coupling,
    All,
}

impl Focus {
    pub fn parse(focus_area: Option<&str>) -> Self {
        match focus_area.map(str::to_lowercase).as_deref() {
            Some("complexity") => Self::Complexity,
            Some("clones") | Some("duplication") => Self::Clones,
            Some("coupling") => Self::Coupling,
            _ => Self::All,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RefactoringSuggestion {
    pub entity_id: String,
    pub entity_name: String,
    pub reason: String,
    /// Rough priority in `[0, 1]`; higher means more worth addressing.
    pub priority: f32,
}

/// Build refactoring suggestions for every entity in `file_path`.
///
/// `clusters` should be the clone clusters already computed for this file
/// (or the wider scope containing it); entities appearing in a cluster
/// get a duplication-focused suggestion regardless of `focus`.
pub fn suggest_refactoring(
    graph: &GraphStore,
    file_path: &str,
    focus: Focus,
    clusters: &[CloneCluster],
) -> Result<Vec<RefactoringSuggestion>> {
    let entities = graph.list_file_entities(file_path).map_err(crate::error::SearchError::GraphStore)?;
    let mut suggestions = Vec::new();

    for entity in &entities {
        if matches!(focus, Focus::All | Focus::Complexity) {
            if let Some(s) = complexity_suggestion(entity) {
                suggestions.push(s);
            }
        }

        if matches!(focus, Focus::All | Focus::Clones) {
            if let Some(s) = clone_suggestion(entity, clusters) {
                suggestions.push(s);
            }
        }

        if matches!(focus, Focus::All | Focus::Coupling) {
            let degree = graph.list_entity_relationships(&entity.id).map_err(crate::error::SearchError::GraphStore)?.len() as i64;
            if let Some(s) = coupling_suggestion(entity, degree) {
                suggestions.push(s);
            }
        }
    }

    suggestions.sort_by(|a, b| b.priority.partial_cmp(&a.priority).unwrap_or(std::cmp::Ordering::Equal));
    Ok(suggestions)
}

fn complexity_suggestion(entity: &Entity) -> Option<RefactoringSuggestion> {
    if entity.complexity_score < HIGH_COMPLEXITY_THRESHOLD {
        return None;
    }
    let priority = (entity.complexity_score as f32 / (HIGH_COMPLEXITY_THRESHOLD as f32 * 2.0)).min(1.0);
    Some(RefactoringSuggestion {
        entity_id: entity.id.clone(),
        entity_name: entity.name.clone(),
        reason: format!("complexity score {} exceeds the extract-method threshold; consider splitting into smaller functions", entity.complexity_score),
        priority,
    })
}

fn clone_suggestion(entity: &Entity, clusters: &[CloneCluster]) -> Option<RefactoringSuggestion> {
    let cluster = clusters.iter().find(|c| c.entity_ids.contains(&entity.id))?;
    Some(RefactoringSuggestion {
        entity_id: entity.id.clone(),
        entity_name: entity.name.clone(),
        reason: format!(
            "near-duplicate of {} other entit{} (avg similarity {:.2}); consider extracting shared logic",
            cluster.entity_ids.len() - 1,
            if cluster.entity_ids.len() == 2 { "y" } else { "ies" },
            cluster.avg_similarity
        ),
        priority: cluster.avg_similarity,
    })
}

fn coupling_suggestion(entity: &Entity, degree: i64) -> Option<RefactoringSuggestion> {
    if degree < HIGH_COUPLING_THRESHOLD {
        return None;
    }
    let priority = (degree as f32 / (HIGH_COUPLING_THRESHOLD as f32 * 2.0)).min(1.0);
    Some(RefactoringSuggestion {
        entity_id: entity.id.clone(),
        entity_name: entity.name.clone(),
        reason: format!("{} incoming/outgoing relationships; consider narrowing its dependencies or splitting responsibilities", degree),
        priority,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use codegraph_core::{EntityType, Location, Position, Storage};
    use serde_json::json;

    fn test_graph() -> GraphStore {
        GraphStore::new(Storage::open_in_memory().unwrap())
    }

    fn entity(id: &str, name: &str, file_path: &str, complexity: u32) -> Entity {
        Entity {
            id: id.to_string(),
            name: name.to_string(),
            entity_type: EntityType::Function,
            file_path: file_path.to_string(),
            location: Location {
                start: Position { line: 1, column: 0, byte_index: 0 },
                end: Position { line: 2, column: 0, byte_index: 10 },
            },
            hash: "h".to_string(),
            language: "rust".to_string(),
            size_bytes: 10,
            complexity_score: complexity,
            metadata: json!({}),
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn flags_high_complexity_entity() {
        let graph = test_graph();
        let e = entity("e1", "big_fn", "f.rs", 30);
        graph.upsert_batch(&[e], &[], 64).unwrap();

        let suggestions = suggest_refactoring(&graph, "f.rs", Focus::Complexity, &[]).unwrap();
        assert_eq!(suggestions.len(), 1);
        assert!(suggestions[0].reason.contains("complexity"));
    }

    #[test]
    fn skips_low_complexity_entity() {
        let graph = test_graph();
        let e = entity("e1", "small_fn", "f.rs", 2);
        graph.upsert_batch(&[e], &[], 64).unwrap();

        let suggestions = suggest_refactoring(&graph, "f.rs", Focus::Complexity, &[]).unwrap();
        assert!(suggestions.is_empty());
    }

    #[test]
    fn flags_clone_cluster_membership() {
        let graph = test_graph();
        let e = entity("e1", "dup_fn", "f.rs", 2);
        graph.upsert_batch(&[e], &[], 64).unwrap();

        let clusters = vec![CloneCluster { entity_ids: vec!["e1".to_string(), "e2".to_string()], avg_similarity: 0.9 }];
        let suggestions = suggest_refactoring(&graph, "f.rs", Focus::Clones, &clusters).unwrap();
        assert_eq!(suggestions.len(), 1);
        assert!(suggestions[0].reason.contains("near-duplicate"));
    }

    #[test]
    fn focus_parses_known_values() {
        assert_eq!(Focus::parse(Some("complexity")), Focus::Complexity);
        assert_eq!(Focus::parse(Some("clones")), Focus::Clones);
        assert_eq!(Focus::parse(Some("coupling")), Focus::Coupling);
        assert_eq!(Focus::parse(None), Focus::All);
        assert_eq!(Focus::parse(Some("bogus")), Focus::All);
    }
}
