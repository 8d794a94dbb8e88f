//! Shared backend contract: both the `sqlite-vec` ANN backend and the
//! BLOB/cosine-scan fallback implement this so [`crate::index::VectorIndex`]
//! can swap between them transparently.

use crate::error::VectorResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    SqliteVec,
    FlatScan,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SqliteVec => "sqlite_vec",
            Self::FlatScan => "flat_scan",
        }
    }
}

/// One scored search result. Ordering is descending by `score`; ties break
/// on ascending `entity_id` for determinism across runs.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub entity_id: String,
    pub score: f32,
}

#[derive(Debug, Clone, Default)]
pub struct VectorStats {
    pub vector_count: u64,
    pub dimension: usize,
    pub backend: &'static str,
    pub avg_search_latency_ms: f64,
}

/// An optional filter narrowing a search to a subset of candidate entities,
/// e.g. by file path prefix. Backends apply it after (flat scan) or during
/// (sqlite-vec `WHERE`) the nearest-neighbor computation.
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    pub file_path_prefix: Option<String>,
    pub language: Option<String>,
}

impl SearchFilter {
    pub fn matches(&self, file_path: &str, language: &str) -> bool {
        if let Some(prefix) = &self.file_path_prefix {
            if !file_path.starts_with(prefix.as_str()) {
                return false;
            }
        }
        if let Some(lang) = &self.language {
            if lang != language {
                return false;
            }
        }
        true
    }
}

pub trait VectorBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Replace any prior vector for `(entity_id, model)`.
    fn upsert(&self, entity_id: &str, model: &str, content: &str, vector: &[f32]) -> VectorResult<()>;

    fn search(&self, vector: &[f32], k: usize, filter: &SearchFilter) -> VectorResult<Vec<SearchHit>>;

    fn delete_by_entity(&self, entity_id: &str) -> VectorResult<()>;

    fn stats(&self) -> VectorResult<VectorStats>;
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
