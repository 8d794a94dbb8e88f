//! Graph Store: typed CRUD over entities/relationships/files, with batch
//! upsert semantics and bounded subgraph traversal.

pub mod schema;

use std::collections::{HashSet, VecDeque};
use std::str::FromStr;
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use tracing::warn;

use crate::error::GraphStoreError;
use crate::model::{Entity, EntityType, FileRecord, Location, Position, Relationship, RelationshipType};
use crate::storage::Storage;

/// Default number of entities written per transaction; adapted at runtime
/// toward `TARGET_BATCH_MS`.
pub const DEFAULT_BATCH_SIZE: usize = 1_000;
pub const MIN_BATCH_SIZE: usize = 100;
pub const MAX_BATCH_SIZE: usize = 5_000;
pub const TARGET_BATCH_MS: u64 = 100;
const MAX_RETRIES: u32 = 3;

/// Hard cap on the number of nodes visited during a subgraph traversal.
pub const SUBGRAPH_NODE_CAP: usize = 10_000;

/// Outcome of a batch write.
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    pub entities_written: usize,
    pub relationships_written: usize,
    pub attempts: u32,
    pub elapsed_ms: u64,
    pub next_batch_size: usize,
}

/// Graph Store: holds a non-owning handle to the shared [`Storage`] and
/// performs all writes through it.
#[derive(Clone)]
pub struct GraphStore {
    storage: Storage,
}

impl GraphStore {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Upsert a batch of entities and relationships produced by indexing one
    /// or more files. Runs inside a single transaction with adaptive sizing
    /// and retry-with-backoff on transient failures.
    pub fn upsert_batch(
        &self,
        entities: &[Entity],
        relationships: &[Relationship],
        batch_size_hint: usize,
    ) -> Result<BatchResult, GraphStoreError> {
        let batch_size = batch_size_hint.clamp(MIN_BATCH_SIZE, MAX_BATCH_SIZE);
        let mut attempts = 0u32;
        let start = std::time::Instant::now();

        loop {
            attempts += 1;
            let outcome = self.storage.with_connection(|conn| {
                write_batch(conn, entities, relationships).map_err(Into::into)
            });

            match outcome {
                Ok(()) => {
                    let elapsed_ms = start.elapsed().as_millis() as u64;
                    let next_batch_size = adapt_batch_size(batch_size, elapsed_ms);
                    return Ok(BatchResult {
                        entities_written: entities.len(),
                        relationships_written: relationships.len(),
                        attempts,
                        elapsed_ms,
                        next_batch_size,
                    });
                }
                Err(e) if attempts < MAX_RETRIES => {
                    let backoff = Duration::from_millis(50 * 2u64.pow(attempts - 1));
                    warn!(attempt = attempts, error = %e, "batch write failed, retrying");
                    std::thread::sleep(backoff);
                }
                Err(e) => {
                    return Err(GraphStoreError::BatchFailed {
                        attempts,
                        message: e.to_string(),
                    })
                }
            }
        }
    }

    /// Purge all entities/relationships for a file path, then insert fresh
    /// ones, within one transaction. Used by the Indexer on re-index.
    pub fn replace_file_entities(
        &self,
        file_path: &str,
        entities: &[Entity],
        relationships: &[Relationship],
    ) -> Result<(), GraphStoreError> {
        self.storage.with_connection(|conn| {
            conn.execute_batch("BEGIN")?;
            let result = (|| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "DELETE FROM entities_fts WHERE id IN (SELECT id FROM entities WHERE file_path = ?1)",
                    params![file_path],
                )?;
                conn.execute("DELETE FROM entities WHERE file_path = ?1", params![file_path])?;
                write_entities(conn, entities)?;
                write_relationships(conn, relationships)?;
                Ok(())
            })();
            match result {
                Ok(()) => {
                    conn.execute_batch("COMMIT")?;
                    Ok(())
                }
                Err(e) => {
                    conn.execute_batch("ROLLBACK").ok();
                    Err(e.into())
                }
            }
        })
    }

    /// Upsert a file's tracking record. `reindex_count` is bumped
    /// automatically when the stored hash differs from the incoming one,
    /// so callers never need to read-then-write to track churn.
    pub fn upsert_file_record(&self, record: &FileRecord) -> Result<(), GraphStoreError> {
        self.storage.with_connection(|conn| {
            conn.execute(
                "INSERT INTO files (path, hash, last_indexed, entity_count, reindex_count) \
                 VALUES (?1, ?2, ?3, ?4, 0) \
                 ON CONFLICT(path) DO UPDATE SET \
                 reindex_count = CASE WHEN files.hash != excluded.hash THEN files.reindex_count + 1 ELSE files.reindex_count END, \
                 hash = excluded.hash, last_indexed = excluded.last_indexed, entity_count = excluded.entity_count",
                params![record.path, record.hash, record.last_indexed, record.entity_count],
            )?;
            Ok(())
        })
    }

    pub fn get_file_record(&self, path: &str) -> Result<Option<FileRecord>, GraphStoreError> {
        self.storage.with_connection(|conn| {
            conn.query_row(
                "SELECT path, hash, last_indexed, entity_count, reindex_count FROM files WHERE path = ?1",
                params![path],
                |row| {
                    Ok(FileRecord {
                        path: row.get(0)?,
                        hash: row.get(1)?,
                        last_indexed: row.get(2)?,
                        entity_count: row.get(3)?,
                        reindex_count: row.get(4)?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
        })
    }

    /// Whether `path`'s on-disk content matches the last-indexed hash.
    pub fn is_up_to_date(&self, path: &str, current_hash: &str) -> Result<bool, GraphStoreError> {
        Ok(self
            .get_file_record(path)?
            .is_some_and(|r| r.hash == current_hash))
    }

    pub fn delete_file(&self, path: &str) -> Result<(), GraphStoreError> {
        self.storage.with_connection(|conn| {
            conn.execute(
                "DELETE FROM entities_fts WHERE id IN (SELECT id FROM entities WHERE file_path = ?1)",
                params![path],
            )?;
            conn.execute("DELETE FROM entities WHERE file_path = ?1", params![path])?;
            conn.execute("DELETE FROM files WHERE path = ?1", params![path])?;
            Ok(())
        })
    }

    pub fn get_entity(&self, id: &str) -> Result<Option<Entity>, GraphStoreError> {
        self.storage
            .with_connection(|conn| fetch_entity(conn, id))
    }

    /// Resolve all entities matching `name` exactly, across every file.
    /// Multiple hits are possible (overloads, same-named methods on
    /// different types); callers disambiguate by file path or type.
    pub fn find_entities_by_name(&self, name: &str) -> Result<Vec<Entity>, GraphStoreError> {
        self.storage.with_connection(|conn| {
            let sql = format!("SELECT {} FROM entities WHERE name = ?1", schema::ENTITY_COLUMNS);
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![name], row_to_entity)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Free-text search over entity names and signatures via the
    /// `entities_fts` FTS5 index, ranked by FTS5's built-in `rank`.
    /// `query` is matched as a literal phrase so callers don't need to
    /// know FTS5 query syntax.
    pub fn text_search(&self, query: &str, limit: usize) -> Result<Vec<Entity>, GraphStoreError> {
        self.storage.with_connection(|conn| {
            let cols: Vec<String> = schema::ENTITY_COLUMNS
                .split(", ")
                .map(|c| format!("entities.{c}"))
                .collect();
            let sql = format!(
                "SELECT {} FROM entities JOIN entities_fts ON entities.id = entities_fts.id \
                 WHERE entities_fts MATCH ?1 ORDER BY rank LIMIT ?2",
                cols.join(", ")
            );
            let phrase = format!("\"{}\"", query.replace('"', "\"\""));
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![phrase, limit as i64], row_to_entity)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Top-`limit` entities by `complexity_score`, ties broken by entity ID.
    pub fn top_by_complexity(&self, limit: usize) -> Result<Vec<(Entity, i64)>, GraphStoreError> {
        self.storage.with_connection(|conn| {
            let sql = format!(
                "SELECT {} FROM entities ORDER BY complexity_score DESC, id ASC LIMIT ?1",
                schema::ENTITY_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![limit as i64], row_to_entity)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows
                .into_iter()
                .map(|e| {
                    let score = e.complexity_score as i64;
                    (e, score)
                })
                .collect())
        })
    }

    /// Top-`limit` entities by incoming+outgoing relationship count, ties
    /// broken by entity ID.
    pub fn top_by_coupling(&self, limit: usize) -> Result<Vec<(Entity, i64)>, GraphStoreError> {
        self.storage.with_connection(|conn| {
            let sql = format!(
                "SELECT {cols}, degree FROM (\
                    SELECT entities.*, (\
                        (SELECT COUNT(*) FROM relationships WHERE from_id = entities.id) + \
                        (SELECT COUNT(*) FROM relationships WHERE to_id = entities.id) \
                    ) AS degree FROM entities\
                 ) ORDER BY degree DESC, id ASC LIMIT ?1",
                cols = schema::ENTITY_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![limit as i64], |row| {
                    let entity = row_to_entity(row)?;
                    let degree: i64 = row.get(17)?;
                    Ok((entity, degree))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Top-`limit` files by `reindex_count` (content-hash churn), ties
    /// broken by path.
    pub fn top_by_churn(&self, limit: usize) -> Result<Vec<(FileRecord, i64)>, GraphStoreError> {
        self.storage.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT path, hash, last_indexed, entity_count, reindex_count FROM files \
                 ORDER BY reindex_count DESC, path ASC LIMIT ?1",
            )?;
            let rows = stmt
                .query_map(params![limit as i64], |row| {
                    let record = FileRecord {
                        path: row.get(0)?,
                        hash: row.get(1)?,
                        last_indexed: row.get(2)?,
                        entity_count: row.get(3)?,
                        reindex_count: row.get(4)?,
                    };
                    let churn = record.reindex_count as i64;
                    Ok((record, churn))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn list_file_entities(&self, file_path: &str) -> Result<Vec<Entity>, GraphStoreError> {
        self.storage.with_connection(|conn| {
            let sql = format!(
                "SELECT {} FROM entities WHERE file_path = ?1 ORDER BY start_byte",
                schema::ENTITY_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![file_path], row_to_entity)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn list_entity_relationships(
        &self,
        entity_id: &str,
    ) -> Result<Vec<Relationship>, GraphStoreError> {
        self.storage.with_connection(|conn| {
            let sql = format!(
                "SELECT {} FROM relationships WHERE from_id = ?1 OR to_id = ?1",
                schema::RELATIONSHIP_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![entity_id], row_to_relationship)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Breadth-first subgraph traversal from `root_id`, bounded by `depth`
    /// and [`SUBGRAPH_NODE_CAP`].
    pub fn get_subgraph(
        &self,
        root_id: &str,
        depth: usize,
    ) -> Result<(Vec<Entity>, Vec<Relationship>), GraphStoreError> {
        self.storage.with_connection(|conn| {
            let mut visited = HashSet::new();
            let mut entities = Vec::new();
            let mut relationships = Vec::new();
            let mut queue = VecDeque::new();
            queue.push_back((root_id.to_string(), 0usize));
            visited.insert(root_id.to_string());

            while let Some((current, level)) = queue.pop_front() {
                if entities.len() >= SUBGRAPH_NODE_CAP {
                    break;
                }
                if let Some(entity) = fetch_entity(conn, &current)? {
                    entities.push(entity);
                }
                if level >= depth {
                    continue;
                }

                let sql = format!(
                    "SELECT {} FROM relationships WHERE from_id = ?1 OR to_id = ?1",
                    schema::RELATIONSHIP_COLUMNS
                );
                let mut stmt = conn.prepare(&sql)?;
                let rels = stmt
                    .query_map(params![current], row_to_relationship)?
                    .collect::<Result<Vec<_>, _>>()?;

                for rel in rels {
                    let neighbor = if rel.from_id == current {
                        rel.to_id.clone()
                    } else {
                        rel.from_id.clone()
                    };
                    relationships.push(rel);
                    if visited.insert(neighbor.clone()) {
                        queue.push_back((neighbor, level + 1));
                    }
                }
            }

            Ok((entities, relationships))
        })
    }

    /// Reverse breadth-first traversal: find entities that transitively
    /// depend on `root_id` by following `calls`/`references`/`imports`
    /// edges backward (i.e. `to_id = current`), bounded by `depth` and
    /// [`SUBGRAPH_NODE_CAP`]. Used for impact analysis ("what breaks if
    /// I change this").
    pub fn reverse_impact(
        &self,
        root_id: &str,
        depth: usize,
    ) -> Result<(Vec<Entity>, Vec<Relationship>), GraphStoreError> {
        self.storage.with_connection(|conn| {
            let mut visited = HashSet::new();
            let mut entities = Vec::new();
            let mut relationships = Vec::new();
            let mut queue = VecDeque::new();
            queue.push_back((root_id.to_string(), 0usize));
            visited.insert(root_id.to_string());

            while let Some((current, level)) = queue.pop_front() {
                if entities.len() >= SUBGRAPH_NODE_CAP {
                    break;
                }
                if let Some(entity) = fetch_entity(conn, &current)? {
                    entities.push(entity);
                }
                if level >= depth {
                    continue;
                }

                let sql = format!(
                    "SELECT {} FROM relationships WHERE to_id = ?1 AND relationship_type IN ('calls','references','imports')",
                    schema::RELATIONSHIP_COLUMNS
                );
                let mut stmt = conn.prepare(&sql)?;
                let rels = stmt
                    .query_map(params![current], row_to_relationship)?
                    .collect::<Result<Vec<_>, _>>()?;

                for rel in rels {
                    let neighbor = rel.from_id.clone();
                    relationships.push(rel);
                    if visited.insert(neighbor.clone()) {
                        queue.push_back((neighbor, level + 1));
                    }
                }
            }

            Ok((entities, relationships))
        })
    }

    /// Ensure a placeholder entity exists for an unresolved cross-file
    /// reference target, so relationship foreign keys remain valid.
    pub fn ensure_placeholder(&self, id: &str, name: &str, file_path: &str) -> Result<(), GraphStoreError> {
        self.storage.with_connection(|conn| {
            let exists: Option<String> = conn
                .query_row("SELECT id FROM entities WHERE id = ?1", params![id], |r| r.get(0))
                .optional()?;
            if exists.is_some() {
                return Ok(());
            }
            let now = now_unix();
            conn.execute(
                "INSERT INTO entities (id, name, entity_type, file_path, start_line, start_column, \
                 start_byte, end_line, end_column, end_byte, hash, language, size_bytes, \
                 complexity_score, metadata_json, created_at, updated_at) \
                 VALUES (?1, ?2, 'external', ?3, 0, 0, 0, 0, 0, 0, '', 'unknown', 0, 0, '{}', ?4, ?4)",
                params![id, name, file_path, now],
            )?;
            conn.execute("DELETE FROM entities_fts WHERE id = ?1", params![id])?;
            conn.execute(
                "INSERT INTO entities_fts (id, name, metadata_signature) VALUES (?1, ?2, '')",
                params![id, name],
            )?;
            Ok(())
        })
    }

    /// Total entity/relationship/file counts, plus a random sample of up to
    /// `sample` entities, for a coarse health check of the persisted graph.
    pub fn graph_health(&self, sample: usize) -> Result<GraphHealth, GraphStoreError> {
        self.storage.with_connection(|conn| {
            let entity_count: i64 = conn.query_row("SELECT COUNT(*) FROM entities", [], |r| r.get(0))?;
            let relationship_count: i64 =
                conn.query_row("SELECT COUNT(*) FROM relationships", [], |r| r.get(0))?;
            let file_count: i64 = conn.query_row("SELECT COUNT(*) FROM files", [], |r| r.get(0))?;

            let sql = format!(
                "SELECT {} FROM entities ORDER BY RANDOM() LIMIT ?1",
                schema::ENTITY_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let entities = stmt
                .query_map(params![sample as i64], row_to_entity)?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(GraphHealth {
                entity_count: entity_count.max(0) as u64,
                relationship_count: relationship_count.max(0) as u64,
                file_count: file_count.max(0) as u64,
                sample: entities,
            })
        })
    }

    /// Delete every entity, relationship, file record, and FTS row. Used by
    /// the `reset_graph`/`clean_index` tool-call operations.
    pub fn reset(&self) -> Result<(), GraphStoreError> {
        self.storage.with_connection(|conn| {
            conn.execute("DELETE FROM entities_fts", [])?;
            conn.execute("DELETE FROM relationships", [])?;
            conn.execute("DELETE FROM entities", [])?;
            conn.execute("DELETE FROM files", [])?;
            conn.execute("DELETE FROM embeddings", [])?;
            Ok(())
        })
    }
}

/// Coarse health snapshot of the persisted graph, backing `get_graph_health`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct GraphHealth {
    pub entity_count: u64,
    pub relationship_count: u64,
    pub file_count: u64,
    pub sample: Vec<Entity>,
}

fn now_unix() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn adapt_batch_size(current: usize, elapsed_ms: u64) -> usize {
    if elapsed_ms == 0 {
        return (current * 2).min(MAX_BATCH_SIZE);
    }
    if elapsed_ms < TARGET_BATCH_MS / 2 {
        (current * 2).clamp(MIN_BATCH_SIZE, MAX_BATCH_SIZE)
    } else if elapsed_ms > TARGET_BATCH_MS * 2 {
        (current / 2).clamp(MIN_BATCH_SIZE, MAX_BATCH_SIZE)
    } else {
        current
    }
}

fn write_batch(
    conn: &Connection,
    entities: &[Entity],
    relationships: &[Relationship],
) -> Result<(), rusqlite::Error> {
    conn.execute_batch("BEGIN")?;
    let result = (|| {
        write_entities(conn, entities)?;
        write_relationships(conn, relationships)?;
        Ok::<(), rusqlite::Error>(())
    })();
    match result {
        Ok(()) => {
            conn.execute_batch("COMMIT")?;
            Ok(())
        }
        Err(e) => {
            conn.execute_batch("ROLLBACK").ok();
            Err(e)
        }
    }
}

fn write_entities(conn: &Connection, entities: &[Entity]) -> Result<(), rusqlite::Error> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO entities (id, name, entity_type, file_path, start_line, start_column, \
         start_byte, end_line, end_column, end_byte, hash, language, size_bytes, \
         complexity_score, metadata_json, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17) \
         ON CONFLICT(id) DO UPDATE SET \
         name = excluded.name, entity_type = excluded.entity_type, file_path = excluded.file_path, \
         start_line = excluded.start_line, start_column = excluded.start_column, start_byte = excluded.start_byte, \
         end_line = excluded.end_line, end_column = excluded.end_column, end_byte = excluded.end_byte, \
         hash = excluded.hash, language = excluded.language, size_bytes = excluded.size_bytes, \
         complexity_score = excluded.complexity_score, metadata_json = excluded.metadata_json, \
         updated_at = excluded.updated_at",
    )?;

    for e in entities {
        stmt.execute(params![
            e.id,
            e.name,
            e.entity_type.as_str(),
            e.file_path,
            e.location.start.line,
            e.location.start.column,
            e.location.start.byte_index,
            e.location.end.line,
            e.location.end.column,
            e.location.end.byte_index,
            e.hash,
            e.language,
            e.size_bytes,
            e.complexity_score,
            e.metadata.to_string(),
            e.created_at,
            e.updated_at,
        ])?;
        sync_fts_entry(conn, e)?;
    }
    Ok(())
}

/// Re-index one entity's FTS row. `entities_fts` is a contentless table
/// with no uniqueness constraint of its own, so the old row (if any) is
/// deleted before inserting the new one.
fn sync_fts_entry(conn: &Connection, e: &Entity) -> Result<(), rusqlite::Error> {
    conn.execute("DELETE FROM entities_fts WHERE id = ?1", params![e.id])?;
    let signature = e.metadata.get("signature").and_then(Value::as_str).unwrap_or("");
    conn.execute(
        "INSERT INTO entities_fts (id, name, metadata_signature) VALUES (?1, ?2, ?3)",
        params![e.id, e.name, signature],
    )?;
    Ok(())
}

fn write_relationships(conn: &Connection, relationships: &[Relationship]) -> Result<(), rusqlite::Error> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO relationships (id, from_id, to_id, relationship_type, metadata_json, weight, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) \
         ON CONFLICT(from_id, to_id, relationship_type) DO UPDATE SET \
         metadata_json = excluded.metadata_json, weight = excluded.weight",
    )?;

    for r in relationships {
        stmt.execute(params![
            r.id,
            r.from_id,
            r.to_id,
            r.relationship_type.as_str(),
            r.metadata.to_string(),
            r.weight,
            r.created_at,
        ])?;
    }
    Ok(())
}

fn fetch_entity(conn: &Connection, id: &str) -> Result<Option<Entity>, GraphStoreError> {
    let sql = format!("SELECT {} FROM entities WHERE id = ?1", schema::ENTITY_COLUMNS);
    conn.query_row(&sql, params![id], row_to_entity)
        .optional()
        .map_err(Into::into)
}

fn row_to_entity(row: &rusqlite::Row) -> rusqlite::Result<Entity> {
    let entity_type_str: String = row.get(2)?;
    let metadata_str: String = row.get(14)?;
    Ok(Entity {
        id: row.get(0)?,
        name: row.get(1)?,
        entity_type: EntityType::from_str(&entity_type_str).unwrap_or(EntityType::External),
        file_path: row.get(3)?,
        location: Location {
            start: Position {
                line: row.get(4)?,
                column: row.get(5)?,
                byte_index: row.get(6)?,
            },
            end: Position {
                line: row.get(7)?,
                column: row.get(8)?,
                byte_index: row.get(9)?,
            },
        },
        hash: row.get(10)?,
        language: row.get(11)?,
        size_bytes: row.get(12)?,
        complexity_score: row.get(13)?,
        metadata: serde_json::from_str::<Value>(&metadata_str).unwrap_or(Value::Null),
        created_at: row.get(15)?,
        updated_at: row.get(16)?,
    })
}

fn row_to_relationship(row: &rusqlite::Row) -> rusqlite::Result<Relationship> {
    let rel_type_str: String = row.get(3)?;
    let metadata_str: String = row.get(4)?;
    Ok(Relationship {
        id: row.get(0)?,
        from_id: row.get(1)?,
        to_id: row.get(2)?,
        relationship_type: RelationshipType::from_str(&rel_type_str)
            .unwrap_or(RelationshipType::References),
        metadata: serde_json::from_str::<Value>(&metadata_str).unwrap_or(Value::Null),
        weight: row.get(5)?,
        created_at: row.get(6)?,
    })
}
