//! [`VectorIndex`]: the public facade over whichever backend is active.
//! Tries the `sqlite-vec` primary at construction time; on any failure to
//! load it, logs a warning and degrades to the flat-scan fallback without
//! returning an error to the caller — the engine keeps serving queries,
//! just without ANN-accelerated search.

use std::sync::Arc;

use codegraph_core::Storage;
use tracing::warn;

use crate::backend::{SearchFilter, SearchHit, VectorBackend, VectorStats};
use crate::error::VectorResult;
use crate::scan;
use crate::sqlite_vec_backend;

pub struct VectorIndex {
    backend: Arc<dyn VectorBackend>,
    dimension: usize,
}

impl VectorIndex {
    /// Open the index backed by `storage`, fixing the vector dimension for
    /// the lifetime of this handle.
    pub fn open(storage: Storage, dimension: usize) -> Self {
        let backend = match sqlite_vec_backend::try_load(&storage, dimension) {
            Ok(backend) => Arc::new(backend) as Arc<dyn VectorBackend>,
            Err(e) => {
                warn!(error = %e, "sqlite-vec unavailable, degrading to flat-scan vector backend");
                scan::wrap(storage, dimension)
            }
        };
        Self { backend, dimension }
    }

    /// Force the flat-scan fallback, bypassing any attempt to load
    /// `sqlite-vec`. Used by callers that want deterministic behavior in
    /// environments where the extension may or may not be present (tests).
    pub fn open_fallback_only(storage: Storage, dimension: usize) -> Self {
        Self {
            backend: scan::wrap(storage, dimension),
            dimension,
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn upsert(&self, entity_id: &str, model: &str, content: &str, vector: &[f32]) -> VectorResult<()> {
        self.backend.upsert(entity_id, model, content, vector)
    }

    pub fn search(&self, vector: &[f32], k: usize) -> VectorResult<Vec<SearchHit>> {
        self.backend.search(vector, k, &SearchFilter::default())
    }

    pub fn search_filtered(&self, vector: &[f32], k: usize, filter: &SearchFilter) -> VectorResult<Vec<SearchHit>> {
        self.backend.search(vector, k, filter)
    }

    pub fn delete_by_entity(&self, entity_id: &str) -> VectorResult<()> {
        self.backend.delete_by_entity(entity_id)
    }

    pub fn stats(&self) -> VectorResult<VectorStats> {
        self.backend.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_index_round_trips() {
        let storage = Storage::open_in_memory().unwrap();
        storage
            .with_connection(|conn| {
                conn.execute(
                    "INSERT INTO entities (id, name, entity_type, file_path, start_line, start_column, \
                     start_byte, end_line, end_column, end_byte, hash, language, size_bytes, \
                     complexity_score, metadata_json, created_at, updated_at) \
                     VALUES ('e1','e1','function','f.rs',0,0,0,0,0,0,'h','rust',1,1,'{}',0,0)",
                    [],
                )?;
                Ok(())
            })
            .unwrap();

        let index = VectorIndex::open_fallback_only(storage, 3);
        index.upsert("e1", "m", "content", &[1.0, 0.0, 0.0]).unwrap();
        let hits = index.search(&[1.0, 0.0, 0.0], 5).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].entity_id, "e1");

        let stats = index.stats().unwrap();
        assert_eq!(stats.vector_count, 1);
        assert_eq!(stats.dimension, 3);
    }

    #[test]
    fn dimension_mismatch_is_rejected() {
        let storage = Storage::open_in_memory().unwrap();
        let index = VectorIndex::open_fallback_only(storage, 4);
        let err = index.upsert("e1", "m", "c", &[1.0, 2.0]).unwrap_err();
        assert!(matches!(err, crate::error::VectorError::DimensionMismatch { .. }));
    }
}
