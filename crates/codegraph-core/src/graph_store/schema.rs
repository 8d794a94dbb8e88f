//! SQL schema for the single persistent code-graph database.
//!
//! One non-partitioned database file per repository: `entities`,
//! `relationships`, `files`, and `embeddings` tables, plus an FTS5 index over
//! entity names and metadata signatures.

pub const SCHEMA_V1: &str = r#"
CREATE TABLE IF NOT EXISTS entities (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    entity_type TEXT NOT NULL,
    file_path TEXT NOT NULL,
    start_line INTEGER NOT NULL,
    start_column INTEGER NOT NULL,
    start_byte INTEGER NOT NULL,
    end_line INTEGER NOT NULL,
    end_column INTEGER NOT NULL,
    end_byte INTEGER NOT NULL,
    hash TEXT NOT NULL,
    language TEXT NOT NULL,
    size_bytes INTEGER NOT NULL,
    complexity_score INTEGER NOT NULL,
    metadata_json TEXT NOT NULL DEFAULT '{}',
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_entities_file ON entities(file_path);
CREATE INDEX IF NOT EXISTS idx_entities_type ON entities(entity_type);
CREATE INDEX IF NOT EXISTS idx_entities_name ON entities(name);

CREATE TABLE IF NOT EXISTS relationships (
    id TEXT PRIMARY KEY NOT NULL,
    from_id TEXT NOT NULL,
    to_id TEXT NOT NULL,
    relationship_type TEXT NOT NULL,
    metadata_json TEXT NOT NULL DEFAULT '{}',
    weight REAL NOT NULL DEFAULT 1.0,
    created_at INTEGER NOT NULL,
    UNIQUE(from_id, to_id, relationship_type),
    FOREIGN KEY(from_id) REFERENCES entities(id) ON DELETE CASCADE,
    FOREIGN KEY(to_id) REFERENCES entities(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_relationships_from ON relationships(from_id);
CREATE INDEX IF NOT EXISTS idx_relationships_to ON relationships(to_id);
CREATE INDEX IF NOT EXISTS idx_relationships_type ON relationships(relationship_type);

CREATE TABLE IF NOT EXISTS files (
    path TEXT PRIMARY KEY NOT NULL,
    hash TEXT NOT NULL,
    last_indexed INTEGER NOT NULL,
    entity_count INTEGER NOT NULL DEFAULT 0,
    reindex_count INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS embeddings (
    entity_id TEXT NOT NULL,
    model_name TEXT NOT NULL,
    content TEXT NOT NULL,
    vector BLOB NOT NULL,
    created_at INTEGER NOT NULL,
    PRIMARY KEY(entity_id, model_name),
    FOREIGN KEY(entity_id) REFERENCES entities(id) ON DELETE CASCADE
);
"#;

pub const SCHEMA_V2_FTS: &str = r#"
CREATE VIRTUAL TABLE IF NOT EXISTS entities_fts USING fts5(
    id UNINDEXED,
    name,
    metadata_signature,
    content=''
);
"#;

/// Column list for `entities` SELECTs, in row-mapping order.
pub const ENTITY_COLUMNS: &str = "id, name, entity_type, file_path, start_line, start_column, \
    start_byte, end_line, end_column, end_byte, hash, language, size_bytes, complexity_score, \
    metadata_json, created_at, updated_at";

/// Column list for `relationships` SELECTs, in row-mapping order.
pub const RELATIONSHIP_COLUMNS: &str =
    "id, from_id, to_id, relationship_type, metadata_json, weight, created_at";

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn schema_creates_expected_tables() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA_V1).unwrap();
        conn.execute_batch(SCHEMA_V2_FTS).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type IN ('table','view') ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        for expected in ["entities", "relationships", "files", "embeddings"] {
            assert!(tables.iter().any(|t| t == expected), "missing table {expected}");
        }
    }

    #[test]
    fn foreign_keys_cascade_requires_pragma() {
        let conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "foreign_keys", true).unwrap();
        conn.execute_batch(SCHEMA_V1).unwrap();

        conn.execute(
            "INSERT INTO entities (id, name, entity_type, file_path, start_line, start_column, \
             start_byte, end_line, end_column, end_byte, hash, language, size_bytes, \
             complexity_score, metadata_json, created_at, updated_at) \
             VALUES ('e1','a','function','f.rs',0,0,0,0,0,0,'h','rust',10,1,'{}',0,0)",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO entities (id, name, entity_type, file_path, start_line, start_column, \
             start_byte, end_line, end_column, end_byte, hash, language, size_bytes, \
             complexity_score, metadata_json, created_at, updated_at) \
             VALUES ('e2','b','function','f.rs',1,0,1,1,0,1,'h','rust',10,1,'{}',0,0)",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO relationships (id, from_id, to_id, relationship_type, metadata_json, weight, created_at) \
             VALUES ('r1','e1','e2','calls','{}',1.0,0)",
            [],
        )
        .unwrap();

        conn.execute("DELETE FROM entities WHERE id = 'e1'", []).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM relationships", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
