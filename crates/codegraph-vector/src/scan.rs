//! Fallback backend: vectors stored as raw `f32` BLOBs in `codegraph-core`'s
//! `embeddings` table, searched by in-process linear cosine scan. An LRU
//! cache of recent query vectors avoids rescanning when the same (or a
//! bit-identical repeated) query arrives back to back.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use codegraph_core::Storage;
use lru::LruCache;

use crate::backend::{cosine_similarity, BackendKind, SearchFilter, SearchHit, VectorBackend, VectorStats};
use crate::error::{VectorError, VectorResult};

const QUERY_CACHE_CAPACITY: usize = 256;

pub struct FlatScanBackend {
    storage: Storage,
    dimension: usize,
    query_cache: Mutex<LruCache<Vec<u32>, Vec<SearchHit>>>,
    avg_latency_ms: Mutex<f64>,
}

impl FlatScanBackend {
    pub fn new(storage: Storage, dimension: usize) -> Self {
        Self {
            storage,
            dimension,
            query_cache: Mutex::new(LruCache::new(
                std::num::NonZeroUsize::new(QUERY_CACHE_CAPACITY).unwrap(),
            )),
            avg_latency_ms: Mutex::new(0.0),
        }
    }

    fn record_latency(&self, ms: f64) {
        let mut avg = self.avg_latency_ms.lock();
        *avg = if *avg == 0.0 { ms } else { (*avg * 0.9) + (ms * 0.1) };
    }
}

pub fn encode_vector(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|f| f.to_le_bytes()).collect()
}

pub fn decode_vector(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

/// Query vectors are floats; the cache key quantizes to bit patterns so
/// identical repeated queries hit without a lossy float-equality compare.
fn cache_key(vector: &[f32], k: usize) -> Vec<u32> {
    let mut key: Vec<u32> = vector.iter().map(|f| f.to_bits()).collect();
    key.push(k as u32);
    key
}

impl VectorBackend for FlatScanBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::FlatScan
    }

    fn upsert(&self, entity_id: &str, model: &str, content: &str, vector: &[f32]) -> VectorResult<()> {
        if vector.len() != self.dimension {
            return Err(VectorError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        let blob = encode_vector(vector);
        let now = now();
        self.storage.with_connection(|conn| {
            conn.execute(
                "INSERT INTO embeddings (entity_id, model_name, content, vector, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5) \
                 ON CONFLICT(entity_id, model_name) DO UPDATE SET \
                 content = excluded.content, vector = excluded.vector, created_at = excluded.created_at",
                rusqlite::params![entity_id, model, content, blob, now],
            )?;
            Ok(())
        })?;
        self.query_cache.lock().clear();
        Ok(())
    }

    fn search(&self, vector: &[f32], k: usize, filter: &SearchFilter) -> VectorResult<Vec<SearchHit>> {
        if vector.len() != self.dimension {
            return Err(VectorError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }

        let key = cache_key(vector, k);
        if filter.file_path_prefix.is_none() && filter.language.is_none() {
            if let Some(hit) = self.query_cache.lock().get(&key) {
                return Ok(hit.clone());
            }
        }

        let start = Instant::now();
        let rows: Vec<(String, Vec<u8>, String, String)> = self.storage.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT e.entity_id, e.vector, en.file_path, en.language \
                 FROM embeddings e JOIN entities en ON en.id = e.entity_id",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;

        let mut scored: Vec<SearchHit> = rows
            .into_iter()
            .filter(|(_, _, file_path, language)| filter.matches(file_path, language))
            .map(|(entity_id, blob, _, _)| {
                let candidate = decode_vector(&blob);
                let score = cosine_similarity(vector, &candidate);
                SearchHit { entity_id, score }
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.entity_id.cmp(&b.entity_id))
        });
        scored.truncate(k);

        self.record_latency(start.elapsed().as_secs_f64() * 1000.0);
        if filter.file_path_prefix.is_none() && filter.language.is_none() {
            self.query_cache.lock().put(key, scored.clone());
        }
        Ok(scored)
    }

    fn delete_by_entity(&self, entity_id: &str) -> VectorResult<()> {
        self.storage.with_connection(|conn| {
            conn.execute("DELETE FROM embeddings WHERE entity_id = ?1", [entity_id])?;
            Ok(())
        })?;
        self.query_cache.lock().clear();
        Ok(())
    }

    fn stats(&self) -> VectorResult<VectorStats> {
        let count: i64 = self.storage.with_connection(|conn| {
            let count = conn.query_row("SELECT COUNT(*) FROM embeddings", [], |r| r.get(0))?;
            Ok(count)
        })?;
        Ok(VectorStats {
            vector_count: count.max(0) as u64,
            dimension: self.dimension,
            backend: BackendKind::FlatScan.as_str(),
            avg_search_latency_ms: *self.avg_latency_ms.lock(),
        })
    }
}

fn now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

pub fn wrap(storage: Storage, dimension: usize) -> Arc<dyn VectorBackend> {
    Arc::new(FlatScanBackend::new(storage, dimension))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_storage() -> Storage {
        Storage::open_in_memory().unwrap()
    }

    fn seed_entity(storage: &Storage, id: &str, file_path: &str, language: &str) {
        storage
            .with_connection(|conn| {
                conn.execute(
                    "INSERT INTO entities (id, name, entity_type, file_path, start_line, start_column, \
                     start_byte, end_line, end_column, end_byte, hash, language, size_bytes, \
                     complexity_score, metadata_json, created_at, updated_at) \
                     VALUES (?1, ?1, 'function', ?2, 0,0,0,0,0,0,'h',?3,1,1,'{}',0,0)",
                    rusqlite::params![id, file_path, language],
                )
            })
            .unwrap();
    }

    #[test]
    fn round_trips_vector_encoding() {
        let v = vec![1.0, -2.5, 3.25];
        assert_eq!(decode_vector(&encode_vector(&v)), v);
    }

    #[test]
    fn upsert_rejects_wrong_dimension() {
        let storage = test_storage();
        let backend = FlatScanBackend::new(storage, 3);
        let err = backend.upsert("e1", "m", "c", &[1.0, 2.0]).unwrap_err();
        assert!(matches!(err, VectorError::DimensionMismatch { .. }));
    }

    #[test]
    fn search_orders_by_score_desc_then_id_asc() {
        let storage = test_storage();
        seed_entity(&storage, "a", "f.rs", "rust");
        seed_entity(&storage, "b", "f.rs", "rust");
        let backend = FlatScanBackend::new(storage, 2);
        backend.upsert("a", "m", "c", &[1.0, 0.0]).unwrap();
        backend.upsert("b", "m", "c", &[1.0, 0.0]).unwrap();

        let hits = backend.search(&[1.0, 0.0], 10, &SearchFilter::default()).unwrap();
        assert_eq!(hits[0].entity_id, "a");
        assert_eq!(hits[1].entity_id, "b");
    }

    #[test]
    fn delete_removes_vector() {
        let storage = test_storage();
        seed_entity(&storage, "a", "f.rs", "rust");
        let backend = FlatScanBackend::new(storage, 2);
        backend.upsert("a", "m", "c", &[1.0, 0.0]).unwrap();
        backend.delete_by_entity("a").unwrap();
        let stats = backend.stats().unwrap();
        assert_eq!(stats.vector_count, 0);
    }

    #[test]
    fn filter_by_file_path_prefix() {
        let storage = test_storage();
        seed_entity(&storage, "a", "src/lib.rs", "rust");
        seed_entity(&storage, "b", "tests/lib.rs", "rust");
        let backend = FlatScanBackend::new(storage, 2);
        backend.upsert("a", "m", "c", &[1.0, 0.0]).unwrap();
        backend.upsert("b", "m", "c", &[1.0, 0.0]).unwrap();

        let filter = SearchFilter { file_path_prefix: Some("src/".to_string()), language: None };
        let hits = backend.search(&[1.0, 0.0], 10, &filter).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].entity_id, "a");
    }
}
