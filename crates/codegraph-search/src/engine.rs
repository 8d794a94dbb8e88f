//! [`SemanticEngine`]: ties the embedding provider, vector index, and
//! graph store together behind the operations the tool-call interface
//! exposes (`semantic_search`, `find_similar_code`, `find_related_concepts`,
//! `cross_language_search`, `detect_code_clones`, `suggest_refactoring`).

use std::sync::Arc;

use codegraph_config::EmbeddingConfig;
use codegraph_core::{Entity, GraphStore};
use codegraph_vector::{SearchFilter, VectorIndex};
use serde::Serialize;
use tracing::debug;

use crate::clone_detection::{self, CloneCluster, CloneScope};
use crate::embeddings::{self, EmbeddingProvider};
use crate::error::Result;
use crate::hybrid::{hybrid_score, structural_score, BreakerProvider};
use crate::refactoring::{self, Focus, RefactoringSuggestion};
use crate::semantic_text::SemanticTextBuilder;

const EMBEDDING_MODEL_LABEL: &str = "semantic-text-v1";

/// A scored, entity-enriched search result.
#[derive(Debug, Clone, Serialize)]
pub struct SemanticSearchResult {
    pub entity: Entity,
    pub score: f32,
    pub structural_score: f32,
    pub semantic_score: f32,
}

pub struct SemanticEngine {
    graph: Arc<GraphStore>,
    vectors: Arc<VectorIndex>,
    provider: Arc<dyn EmbeddingProvider>,
}

impl SemanticEngine {
    pub fn new(graph: Arc<GraphStore>, vectors: Arc<VectorIndex>, config: &EmbeddingConfig) -> Result<Self> {
        let raw_provider = embeddings::create_provider(config, vectors.dimension())?;
        let provider: Arc<dyn EmbeddingProvider> =
            Arc::new(BreakerProvider::with_thresholds(raw_provider, config.breaker_failure_threshold, std::time::Duration::from_secs(config.breaker_cooldown_secs)));
        Ok(Self { graph, vectors, provider })
    }

    #[cfg(test)]
    pub fn with_provider(graph: Arc<GraphStore>, vectors: Arc<VectorIndex>, provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self { graph, vectors, provider }
    }

    /// Embed and store `entity`'s composed semantic text. Called by the
    /// indexer's new-entities notifications to keep the vector index
    /// current as the graph changes.
    pub async fn index_entity(&self, entity: &Entity) -> Result<()> {
        let text = SemanticTextBuilder::new(&self.graph).build(entity);
        let vector = self.provider.encode(vec![text.clone()]).await?.pop().ok_or_else(|| {
            crate::error::SearchError::Embedding("embedding provider returned no vector".to_string())
        })?;
        self.vectors.upsert(&entity.id, EMBEDDING_MODEL_LABEL, &text, &vector)?;
        Ok(())
    }

    pub async fn index_entities(&self, entities: &[Entity]) -> Result<()> {
        for entity in entities {
            self.index_entity(entity).await?;
        }
        Ok(())
    }

    /// Embed `query_text`, search the top `k` vector hits, and enrich each
    /// with its entity record and a hybrid score that also accounts for a
    /// structural (name/type) match.
    pub async fn semantic_search(&self, query_text: &str, k: usize) -> Result<Vec<SemanticSearchResult>> {
        let vector = self.embed_one(query_text).await?;
        let hits = self.vectors.search(&vector, k)?;
        self.enrich(query_text, hits)
    }

    /// Embed a code snippet and return hits at or above `threshold`.
    pub async fn find_similar_code(&self, code_snippet: &str, threshold: f32, k: usize) -> Result<Vec<SemanticSearchResult>> {
        let vector = self.embed_one(code_snippet).await?;
        let hits = self.vectors.search(&vector, k)?;
        let filtered: Vec<_> = hits.into_iter().filter(|h| h.score >= threshold).collect();
        self.enrich(code_snippet, filtered)
    }

    /// Embed `entity_id`'s own semantic text and find its nearest
    /// neighbors, excluding itself.
    pub async fn find_related_concepts(&self, entity_id: &str, k: usize) -> Result<Vec<SemanticSearchResult>> {
        let entity = self
            .graph
            .get_entity(entity_id)?
            .ok_or_else(|| crate::error::SearchError::EntityNotFound(entity_id.to_string()))?;
        let text = SemanticTextBuilder::new(&self.graph).build(&entity);
        let vector = self.provider.encode(vec![text]).await?.pop().ok_or_else(|| {
            crate::error::SearchError::Embedding("embedding provider returned no vector".to_string())
        })?;
        let hits = self.vectors.search(&vector, k + 1)?;
        let filtered: Vec<_> = hits.into_iter().filter(|h| h.entity_id != entity_id).take(k).collect();
        self.enrich(&entity.name, filtered)
    }

    /// `semantic_search` restricted to entities whose language is in
    /// `languages` (or unfiltered if empty).
    pub async fn cross_language_search(&self, query_text: &str, languages: &[String], k: usize) -> Result<Vec<SemanticSearchResult>> {
        let vector = self.embed_one(query_text).await?;

        if languages.is_empty() {
            let hits = self.vectors.search(&vector, k)?;
            return self.enrich(query_text, hits);
        }

        let mut results = Vec::new();
        for language in languages {
            let filter = SearchFilter { file_path_prefix: None, language: Some(language.clone()) };
            let hits = self.vectors.search_filtered(&vector, k, &filter)?;
            results.extend(self.enrich(query_text, hits)?);
        }
        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(k);
        Ok(results)
    }

    pub async fn detect_code_clones(&self, min_similarity: f32, scope: &CloneScope) -> Result<Vec<CloneCluster>> {
        clone_detection::detect_code_clones(&self.graph, &self.vectors, self.provider.as_ref(), min_similarity, scope).await
    }

    pub async fn suggest_refactoring(&self, file_path: &str, focus_area: Option<&str>) -> Result<Vec<RefactoringSuggestion>> {
        let focus = Focus::parse(focus_area);
        let clusters = self
            .detect_code_clones(0.85, &CloneScope { file_path: Some(file_path.to_string()) })
            .await
            .unwrap_or_default();
        refactoring::suggest_refactoring(&self.graph, file_path, focus, &clusters)
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        self.provider
            .encode(vec![text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| crate::error::SearchError::Embedding("embedding provider returned no vector".to_string()))
    }

    fn enrich(&self, query_text: &str, hits: Vec<codegraph_vector::SearchHit>) -> Result<Vec<SemanticSearchResult>> {
        let mut results = Vec::with_capacity(hits.len());
        for hit in hits {
            let Some(entity) = self.graph.get_entity(&hit.entity_id)? else {
                debug!(entity_id = %hit.entity_id, "vector hit references an entity no longer in the graph, skipping");
                continue;
            };
            let structural = structural_score(query_text, &entity);
            let score = hybrid_score(structural, hit.score);
            results.push(SemanticSearchResult { entity, score, structural_score: structural, semantic_score: hit.score });
        }
        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use codegraph_config::EmbeddingProviderType;
    use codegraph_core::{EntityType, Location, Position, Storage};
    use serde_json::json;

    struct StubProvider;

    #[async_trait]
    impl EmbeddingProvider for StubProvider {
        async fn encode(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| if t.contains("parse") { vec![1.0, 0.0, 0.0] } else { vec![0.0, 1.0, 0.0] })
                .collect())
        }

        async fn check_status(&self) -> Result<crate::embeddings::ProviderStatus> {
            Ok(crate::embeddings::ProviderStatus::healthy(EmbeddingProviderType::Local, "test"))
        }

        async fn warmup(&self) -> Result<()> {
            Ok(())
        }

        fn embedding_dim(&self) -> usize {
            3
        }

        fn provider_type(&self) -> EmbeddingProviderType {
            EmbeddingProviderType::Local
        }
    }

    fn entity(id: &str, name: &str) -> Entity {
        Entity {
            id: id.to_string(),
            name: name.to_string(),
            entity_type: EntityType::Function,
            file_path: "f.rs".to_string(),
            location: Location {
                start: Position { line: 1, column: 0, byte_index: 0 },
                end: Position { line: 2, column: 0, byte_index: 10 },
            },
            hash: "h".to_string(),
            language: "rust".to_string(),
            size_bytes: 10,
            complexity_score: 1,
            metadata: json!({}),
            created_at: 0,
            updated_at: 0,
        }
    }

    fn test_engine() -> SemanticEngine {
        let graph = Arc::new(GraphStore::new(Storage::open_in_memory().unwrap()));
        let vectors = Arc::new(VectorIndex::open_fallback_only(Storage::open_in_memory().unwrap(), 3));
        SemanticEngine::with_provider(graph, vectors, Arc::new(StubProvider))
    }

    #[tokio::test]
    async fn index_then_search_finds_entity() {
        let engine = test_engine();
        let e = entity("e1", "parse_file");
        engine.graph.upsert_batch(std::slice::from_ref(&e), &[], 64).unwrap();
        engine.index_entity(&e).await.unwrap();

        let results = engine.semantic_search("parse_file", 5).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].entity.id, "e1");
        assert!(results[0].score > 0.0);
    }

    #[tokio::test]
    async fn find_related_concepts_excludes_self() {
        let engine = test_engine();
        let a = entity("a", "parse_file");
        let b = entity("b", "parse_document");
        engine.graph.upsert_batch(&[a.clone(), b.clone()], &[], 64).unwrap();
        engine.index_entity(&a).await.unwrap();
        engine.index_entity(&b).await.unwrap();

        let results = engine.find_related_concepts("a", 5).await.unwrap();
        assert!(results.iter().all(|r| r.entity.id != "a"));
    }

    #[tokio::test]
    async fn find_similar_code_filters_by_threshold() {
        let engine = test_engine();
        let e = entity("e1", "render_other");
        engine.graph.upsert_batch(std::slice::from_ref(&e), &[], 64).unwrap();
        engine.index_entity(&e).await.unwrap();

        let results = engine.find_similar_code("parse_file", 0.99, 5).await.unwrap();
        assert!(results.is_empty());
    }
}
