//! Hybrid ranking and the embedding circuit breaker.
//!
//! Two independent signals feed a search result: a *structural* score (does
//! the query look like a name/type that's actually in the graph) and a
//! *semantic* score (vector cosine similarity). [`hybrid_score`] combines
//! them with a small boost when both agree.
//!
//! [`BreakerProvider`] wraps an [`EmbeddingProvider`] so that repeated
//! provider failures don't cascade into every caller: after
//! `failure_threshold` consecutive failures it "opens" for `cooldown`,
//! during which `encode` is satisfied from a deterministic hash-based
//! fallback instead of calling the underlying provider.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use codegraph_config::{EmbeddingProviderType, DEFAULT_BREAKER_COOLDOWN_SECS, DEFAULT_BREAKER_FAILURE_THRESHOLD};
use codegraph_core::Entity;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::embeddings::{EmbeddingProvider, ProviderStatus};
use crate::error::Result;

const STRUCTURAL_WEIGHT: f32 = 0.6;
const SEMANTIC_WEIGHT: f32 = 0.4;
const AGREEMENT_BOOST: f32 = 1.2;

/// Combine a structural and a semantic score into the final ranking
/// score. Both inputs are expected in `[0, 1]`; the result is clamped to
/// the same range.
pub fn hybrid_score(structural: f32, semantic: f32) -> f32 {
    let mut score = STRUCTURAL_WEIGHT * structural + SEMANTIC_WEIGHT * semantic;
    if structural > 0.0 && semantic > 0.0 {
        score *= AGREEMENT_BOOST;
    }
    score.clamp(0.0, 1.0)
}

/// Structural relevance of `query` against `entity`: exact name match
/// scores highest, a case-insensitive substring match scores partial
/// credit, and a match against the entity's type name adds a smaller
/// bonus on top.
pub fn structural_score(query: &str, entity: &Entity) -> f32 {
    let query_lower = query.to_lowercase();
    let name_lower = entity.name.to_lowercase();

    let mut score = if name_lower == query_lower {
        1.0
    } else if name_lower.contains(&query_lower) || query_lower.contains(&name_lower) {
        0.6
    } else {
        0.0
    };

    if query_lower.contains(entity.entity_type.as_str()) {
        score = (score + 0.2).min(1.0);
    }

    score
}

/// A ranked hit combining an entity with its structural/semantic/final
/// scores.
#[derive(Debug, Clone)]
pub struct HybridSearchHit {
    pub entity_id: String,
    pub structural_score: f32,
    pub semantic_score: f32,
    pub score: f32,
}

impl HybridSearchHit {
    pub fn new(entity_id: impl Into<String>, structural_score: f32, semantic_score: f32) -> Self {
        let score = hybrid_score(structural_score, semantic_score);
        Self { entity_id: entity_id.into(), structural_score, semantic_score, score }
    }
}

/// Wraps an [`EmbeddingProvider`], opening a circuit breaker after
/// repeated failures so callers keep getting *some* embedding instead of
/// a cascading error while a remote endpoint is down.
pub struct BreakerProvider {
    inner: Arc<dyn EmbeddingProvider>,
    failure_threshold: u32,
    cooldown: Duration,
    consecutive_failures: AtomicU32,
    opened_at: Mutex<Option<Instant>>,
    dim: usize,
}

impl BreakerProvider {
    pub fn new(inner: Arc<dyn EmbeddingProvider>) -> Self {
        Self::with_thresholds(inner, DEFAULT_BREAKER_FAILURE_THRESHOLD, Duration::from_secs(DEFAULT_BREAKER_COOLDOWN_SECS))
    }

    pub fn with_thresholds(inner: Arc<dyn EmbeddingProvider>, failure_threshold: u32, cooldown: Duration) -> Self {
        let dim = inner.embedding_dim();
        Self {
            inner,
            failure_threshold,
            cooldown,
            consecutive_failures: AtomicU32::new(0),
            opened_at: Mutex::new(None),
            dim,
        }
    }

    fn is_open(&self) -> bool {
        let mut opened_at = self.opened_at.lock();
        match *opened_at {
            Some(since) if since.elapsed() < self.cooldown => true,
            Some(_) => {
                // cooldown elapsed, half-open: let the next call retry the real provider
                *opened_at = None;
                self.consecutive_failures.store(0, Ordering::Relaxed);
                false
            }
            None => false,
        }
    }

    fn record_success(&self) {
        self.consecutive_failures.store(0, Ordering::Relaxed);
    }

    fn record_failure(&self) {
        let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
        if failures >= self.failure_threshold {
            warn!(failures, "embedding provider circuit breaker opening");
            *self.opened_at.lock() = Some(Instant::now());
        }
    }

    /// Deterministic fallback embedding: hash the text into a `dim`-length
    /// unit vector. Not semantically meaningful, but stable and cheap, so
    /// search keeps functioning (structural signal still ranks results)
    /// while the real provider is unavailable.
    fn fallback_encode(&self, texts: &[String]) -> Vec<Vec<f32>> {
        texts.iter().map(|text| fallback_vector(text, self.dim)).collect()
    }
}

fn fallback_vector(text: &str, dim: usize) -> Vec<f32> {
    let mut vector = Vec::with_capacity(dim);
    let mut counter: u32 = 0;
    while vector.len() < dim {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        hasher.update(counter.to_le_bytes());
        let digest = hasher.finalize();
        for chunk in digest.chunks(4) {
            if vector.len() >= dim {
                break;
            }
            let mut bytes = [0u8; 4];
            bytes[..chunk.len()].copy_from_slice(chunk);
            let value = u32::from_le_bytes(bytes) as f32 / u32::MAX as f32;
            vector.push(value * 2.0 - 1.0);
        }
        counter += 1;
    }

    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
    vector
}

#[async_trait]
impl EmbeddingProvider for BreakerProvider {
    async fn encode(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if self.is_open() {
            return Ok(self.fallback_encode(&texts));
        }

        match self.inner.encode(texts.clone()).await {
            Ok(embeddings) => {
                self.record_success();
                Ok(embeddings)
            }
            Err(e) => {
                warn!(error = %e, "embedding provider call failed, falling back to deterministic vectors");
                self.record_failure();
                Ok(self.fallback_encode(&texts))
            }
        }
    }

    async fn check_status(&self) -> Result<ProviderStatus> {
        if self.is_open() {
            return Ok(ProviderStatus::unavailable(self.inner.provider_type(), "circuit breaker open"));
        }
        self.inner.check_status().await
    }

    async fn warmup(&self) -> Result<()> {
        self.inner.warmup().await
    }

    fn embedding_dim(&self) -> usize {
        self.dim
    }

    fn provider_type(&self) -> EmbeddingProviderType {
        self.inner.provider_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codegraph_core::{EntityType, Location, Position};

    fn entity(name: &str, entity_type: EntityType) -> Entity {
        Entity {
            id: "e".to_string(),
            name: name.to_string(),
            entity_type,
            file_path: "f.rs".to_string(),
            location: Location {
                start: Position { line: 1, column: 0, byte_index: 0 },
                end: Position { line: 2, column: 0, byte_index: 10 },
            },
            hash: "h".to_string(),
            language: "rust".to_string(),
            size_bytes: 10,
            complexity_score: 1,
            metadata: serde_json::json!({}),
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn hybrid_score_boosts_agreement() {
        let both = hybrid_score(0.8, 0.8);
        let structural_only = hybrid_score(0.8, 0.0);
        let semantic_only = hybrid_score(0.0, 0.8);
        assert!(both > structural_only);
        assert!(both > semantic_only);
    }

    #[test]
    fn hybrid_score_clamped_to_one() {
        assert_eq!(hybrid_score(1.0, 1.0), 1.0);
    }

    #[test]
    fn hybrid_score_zero_when_no_signal() {
        assert_eq!(hybrid_score(0.0, 0.0), 0.0);
    }

    #[test]
    fn structural_score_exact_match() {
        let e = entity("parse_file", EntityType::Function);
        assert_eq!(structural_score("parse_file", &e), 1.0);
    }

    #[test]
    fn structural_score_substring_match() {
        let e = entity("parse_file_contents", EntityType::Function);
        assert!(structural_score("parse_file", &e) > 0.0);
        assert!(structural_score("parse_file", &e) < 1.0);
    }

    #[test]
    fn structural_score_no_match() {
        let e = entity("unrelated", EntityType::Function);
        assert_eq!(structural_score("parse_file", &e), 0.0);
    }

    struct FlakyProvider {
        calls: AtomicU32,
        fail_first: u32,
    }

    #[async_trait]
    impl EmbeddingProvider for FlakyProvider {
        async fn encode(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
            let call = self.calls.fetch_add(1, Ordering::Relaxed);
            if call < self.fail_first {
                return Err(crate::error::SearchError::Embedding("simulated failure".to_string()));
            }
            Ok(texts.iter().map(|_| vec![1.0; 4]).collect())
        }

        async fn check_status(&self) -> Result<ProviderStatus> {
            Ok(ProviderStatus::healthy(EmbeddingProviderType::Local, "test"))
        }

        async fn warmup(&self) -> Result<()> {
            Ok(())
        }

        fn embedding_dim(&self) -> usize {
            4
        }

        fn provider_type(&self) -> EmbeddingProviderType {
            EmbeddingProviderType::Local
        }
    }

    #[tokio::test]
    async fn breaker_falls_back_after_threshold_failures() {
        let provider = Arc::new(FlakyProvider { calls: AtomicU32::new(0), fail_first: 100 });
        let breaker = BreakerProvider::with_thresholds(provider, 3, Duration::from_secs(60));

        for _ in 0..3 {
            let result = breaker.encode(vec!["x".to_string()]).await.unwrap();
            assert_eq!(result[0].len(), 4);
        }

        // Breaker should now be open; encode still succeeds via fallback.
        let result = breaker.encode(vec!["x".to_string()]).await.unwrap();
        assert_eq!(result[0].len(), 4);
    }

    #[tokio::test]
    async fn breaker_passes_through_on_success() {
        let provider = Arc::new(FlakyProvider { calls: AtomicU32::new(0), fail_first: 0 });
        let breaker = BreakerProvider::new(provider);
        let result = breaker.encode(vec!["x".to_string()]).await.unwrap();
        assert_eq!(result[0], vec![1.0; 4]);
    }

    #[test]
    fn fallback_vector_is_deterministic_and_normalized() {
        let a = fallback_vector("hello world", 768);
        let b = fallback_vector("hello world", 768);
        assert_eq!(a, b);
        let norm: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[test]
    fn fallback_vector_differs_by_input() {
        let a = fallback_vector("hello", 32);
        let b = fallback_vector("world", 32);
        assert_ne!(a, b);
    }
}
