//! Code clone detection: pairwise nearest-neighbor search via the vector
//! index, clustered by transitive closure.

use std::collections::{HashMap, HashSet, VecDeque};

use codegraph_core::GraphStore;
use codegraph_vector::VectorIndex;
use serde::Serialize;

use crate::embeddings::EmbeddingProvider;
use crate::error::Result;
use crate::semantic_text::SemanticTextBuilder;

/// Per-entity candidate limit when probing the vector index for clones.
/// Kept small: clone clusters are rarely larger than this in practice, and
/// a wider probe would just cost more search time for no extra recall.
const CANDIDATES_PER_ENTITY: usize = 8;

/// Hard cap on cluster size so one over-broad similarity threshold can't
/// produce a single cluster spanning the whole repository.
const MAX_CLUSTER_SIZE: usize = 50;

#[derive(Debug, Clone, Serialize)]
pub struct ClonePair {
    pub entity_id: String,
    pub similar_entity_id: String,
    pub similarity: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct CloneCluster {
    pub entity_ids: Vec<String>,
    /// Mean pairwise similarity observed among the edges that formed this
    /// cluster (not every pair within it was directly compared).
    pub avg_similarity: f32,
}

/// Optional scope restricting which entities are considered as clone
/// seeds, e.g. a single file.
#[derive(Debug, Clone, Default)]
pub struct CloneScope {
    pub file_path: Option<String>,
}

/// Find groups of near-duplicate entities within `scope` (or the whole
/// graph if unscoped).
///
/// Each candidate's semantic text is re-embedded and searched against the
/// vector index; hits at or above `min_similarity` become pairwise edges,
/// which are then merged into clusters via transitive closure, each
/// bounded to [`MAX_CLUSTER_SIZE`].
pub async fn detect_code_clones(
    graph: &GraphStore,
    vectors: &VectorIndex,
    embedder: &dyn EmbeddingProvider,
    min_similarity: f32,
    scope: &CloneScope,
) -> Result<Vec<CloneCluster>> {
    let candidates = match &scope.file_path {
        Some(path) => graph.list_file_entities(path).map_err(crate::error::SearchError::GraphStore)?,
        None => {
            const UNSCOPED_CANDIDATE_CAP: usize = 5_000;
            graph
                .top_by_complexity(UNSCOPED_CANDIDATE_CAP)
                .map_err(crate::error::SearchError::GraphStore)?
                .into_iter()
                .map(|(e, _)| e)
                .collect()
        }
    };

    if candidates.is_empty() {
        return Ok(vec![]);
    }

    let builder = SemanticTextBuilder::new(graph);
    let texts: Vec<String> = candidates.iter().map(|e| builder.build(e)).collect();
    let vecs = embedder.encode(texts).await?;

    let mut pairs = Vec::new();
    for (entity, vector) in candidates.iter().zip(vecs.iter()) {
        let hits = vectors.search(vector, CANDIDATES_PER_ENTITY + 1)?;
        for hit in hits {
            if hit.entity_id == entity.id {
                continue;
            }
            if hit.score >= min_similarity {
                pairs.push(ClonePair { entity_id: entity.id.clone(), similar_entity_id: hit.entity_id, similarity: hit.score });
            }
        }
    }

    Ok(cluster_pairs(&pairs))
}

/// Cluster pairs by transitive closure (adjacency BFS), bounding any
/// single cluster at [`MAX_CLUSTER_SIZE`] members.
pub fn cluster_pairs(pairs: &[ClonePair]) -> Vec<CloneCluster> {
    let mut adjacency: HashMap<&str, Vec<(&str, f32)>> = HashMap::new();
    for pair in pairs {
        adjacency.entry(pair.entity_id.as_str()).or_default().push((pair.similar_entity_id.as_str(), pair.similarity));
        adjacency.entry(pair.similar_entity_id.as_str()).or_default().push((pair.entity_id.as_str(), pair.similarity));
    }

    let mut visited = HashSet::new();
    let mut clusters = Vec::new();

    for &start in adjacency.keys() {
        if visited.contains(start) {
            continue;
        }
        let mut members = Vec::new();
        let mut similarities = Vec::new();
        let mut queue = VecDeque::new();
        queue.push_back(start);
        visited.insert(start);

        while let Some(current) = queue.pop_front() {
            members.push(current.to_string());
            if members.len() >= MAX_CLUSTER_SIZE {
                break;
            }
            if let Some(neighbors) = adjacency.get(current) {
                for &(neighbor, similarity) in neighbors {
                    similarities.push(similarity);
                    if visited.insert(neighbor) {
                        queue.push_back(neighbor);
                    }
                }
            }
        }

        if members.len() >= 2 {
            let avg_similarity = similarities.iter().sum::<f32>() / similarities.len().max(1) as f32;
            members.sort();
            clusters.push(CloneCluster { entity_ids: members, avg_similarity });
        }
    }

    clusters.sort_by(|a, b| b.avg_similarity.partial_cmp(&a.avg_similarity).unwrap_or(std::cmp::Ordering::Equal));
    clusters
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(a: &str, b: &str, sim: f32) -> ClonePair {
        ClonePair { entity_id: a.to_string(), similar_entity_id: b.to_string(), similarity: sim }
    }

    #[test]
    fn clusters_transitively_connected_pairs() {
        let pairs = vec![pair("a", "b", 0.95), pair("b", "c", 0.9)];
        let clusters = cluster_pairs(&pairs);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].entity_ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn keeps_disjoint_clusters_separate() {
        let pairs = vec![pair("a", "b", 0.95), pair("x", "y", 0.9)];
        let clusters = cluster_pairs(&pairs);
        assert_eq!(clusters.len(), 2);
    }

    #[test]
    fn no_edges_produce_no_cluster() {
        let clusters = cluster_pairs(&[]);
        assert!(clusters.is_empty());
    }

    #[test]
    fn clusters_sorted_by_average_similarity_descending() {
        let pairs = vec![pair("a", "b", 0.7), pair("x", "y", 0.99)];
        let clusters = cluster_pairs(&pairs);
        assert!(clusters[0].avg_similarity > clusters[1].avg_similarity);
    }

    #[test]
    fn cluster_size_is_bounded() {
        let mut pairs = Vec::new();
        for i in 0..(MAX_CLUSTER_SIZE + 20) {
            pairs.push(pair("hub", &format!("n{i}"), 0.9));
        }
        let clusters = cluster_pairs(&pairs);
        assert!(clusters[0].entity_ids.len() <= MAX_CLUSTER_SIZE);
    }
}
