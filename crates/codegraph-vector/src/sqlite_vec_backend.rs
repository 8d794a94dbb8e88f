//! Primary backend: the `sqlite-vec` extension's `vec0` virtual table,
//! queried with `WHERE embedding MATCH ? LIMIT k` for approximate nearest
//! neighbor search. `VectorIndex::open` tries this first and logs a
//! warning before degrading to [`crate::scan::FlatScanBackend`] if the
//! extension fails to load.

use std::time::Instant;

use codegraph_core::Storage;
use parking_lot::Mutex;
use rusqlite::Connection;

use crate::backend::{BackendKind, SearchFilter, SearchHit, VectorBackend, VectorStats};
use crate::error::{VectorError, VectorResult};
use crate::scan::encode_vector;

pub struct SqliteVecBackend {
    storage: Storage,
    dimension: usize,
    avg_latency_ms: Mutex<f64>,
}

/// Attempt to load the `sqlite-vec` extension and create its virtual table
/// on `storage`'s connection. Returns `Err` (never panics) if the
/// extension isn't available in this build/environment, so the caller can
/// degrade to the fallback backend.
pub fn try_load(storage: &Storage, dimension: usize) -> VectorResult<SqliteVecBackend> {
    // Registers `vec0` as an auto-extension so every connection opened by
    // this process (including ones `rusqlite` opens internally for
    // `query_row`/`prepare`) picks it up, per sqlite-vec's documented
    // rusqlite integration.
    unsafe {
        rusqlite::ffi::sqlite3_auto_extension(Some(std::mem::transmute::<
            *const (),
            unsafe extern "C" fn(
                *mut rusqlite::ffi::sqlite3,
                *mut *mut std::os::raw::c_char,
                *const rusqlite::ffi::sqlite3_api_routines,
            ) -> std::os::raw::c_int,
        >(sqlite_vec::sqlite3_vec_init as *const ())));
    }

    storage.with_connection(|conn| {
        create_virtual_table(conn, dimension)?;
        Ok(())
    })?;

    Ok(SqliteVecBackend {
        storage: storage.clone(),
        dimension,
        avg_latency_ms: Mutex::new(0.0),
    })
}

fn create_virtual_table(conn: &Connection, dimension: usize) -> rusqlite::Result<()> {
    conn.execute_batch(&format!(
        "CREATE VIRTUAL TABLE IF NOT EXISTS vec_embeddings USING vec0(
            entity_id TEXT PRIMARY KEY,
            embedding FLOAT[{dimension}]
        );"
    ))
}

impl SqliteVecBackend {
    fn record_latency(&self, ms: f64) {
        let mut avg = self.avg_latency_ms.lock();
        *avg = if *avg == 0.0 { ms } else { (*avg * 0.9) + (ms * 0.1) };
    }
}

impl VectorBackend for SqliteVecBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::SqliteVec
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
            conn.execute(
                "INSERT INTO vec_embeddings (entity_id, embedding) VALUES (?1, ?2) \
                 ON CONFLICT(entity_id) DO UPDATE SET embedding = excluded.embedding",
                rusqlite::params![entity_id, blob],
            )?;
            Ok(())
        })?;
        Ok(())
    }

    fn search(&self, vector: &[f32], k: usize, filter: &SearchFilter) -> VectorResult<Vec<SearchHit>> {
        if vector.len() != self.dimension {
            return Err(VectorError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        let blob = encode_vector(vector);
        let start = Instant::now();

        // vec0 doesn't support arbitrary post-filter predicates in a MATCH
        // query, so fetch a wider candidate set and filter/truncate here.
        let fetch_k = if filter.file_path_prefix.is_some() || filter.language.is_some() {
            (k * 8).max(64)
        } else {
            k
        };

        let rows: Vec<(String, f64)> = self.storage.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT entity_id, distance FROM vec_embeddings \
                 WHERE embedding MATCH ?1 AND k = ?2 ORDER BY distance",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![blob, fetch_k as i64], |row| {
                    Ok((row.get(0)?, row.get(1)?))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;

        let mut hits: Vec<SearchHit> = if filter.file_path_prefix.is_some() || filter.language.is_some() {
            let meta: Vec<(String, String, String)> = self.storage.with_connection(|conn| {
                let mut stmt = conn.prepare("SELECT id, file_path, language FROM entities")?;
                let rows = stmt
                    .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })?;
            rows.into_iter()
                .filter_map(|(entity_id, distance)| {
                    meta.iter()
                        .find(|(id, _, _)| *id == entity_id)
                        .filter(|(_, fp, lang)| filter.matches(fp, lang))
                        .map(|_| SearchHit { entity_id, score: 1.0 - (distance as f32) })
                })
                .collect()
        } else {
            rows.into_iter()
                .map(|(entity_id, distance)| SearchHit { entity_id, score: 1.0 - (distance as f32) })
                .collect()
        };

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.entity_id.cmp(&b.entity_id))
        });
        hits.truncate(k);

        self.record_latency(start.elapsed().as_secs_f64() * 1000.0);
        Ok(hits)
    }

    fn delete_by_entity(&self, entity_id: &str) -> VectorResult<()> {
        self.storage.with_connection(|conn| {
            conn.execute("DELETE FROM embeddings WHERE entity_id = ?1", [entity_id])?;
            conn.execute("DELETE FROM vec_embeddings WHERE entity_id = ?1", [entity_id])?;
            Ok(())
        })?;
        Ok(())
    }

    fn stats(&self) -> VectorResult<VectorStats> {
        let count: i64 = self.storage.with_connection(|conn| {
            let count = conn.query_row("SELECT COUNT(*) FROM vec_embeddings", [], |r| r.get(0))?;
            Ok(count)
        })?;
        Ok(VectorStats {
            vector_count: count.max(0) as u64,
            dimension: self.dimension,
            backend: BackendKind::SqliteVec.as_str(),
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
