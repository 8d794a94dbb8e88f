//! Error types shared by the storage engine, graph store, and parser.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from the Storage Engine.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("failed to open database at '{path}': {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("migration {version} failed: {message}")]
    MigrationFailed { version: u32, message: String },

    #[error("schema checksum mismatch for already-applied migration {version}: expected {expected}, found {found}")]
    ChecksumMismatch {
        version: u32,
        expected: String,
        found: String,
    },

    /// Unrecoverable inconsistency; the caller should not retry.
    #[error("fatal storage error: {0}")]
    Fatal(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the Graph Store.
#[derive(Error, Debug)]
pub enum GraphStoreError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("entity not found: {0}")]
    EntityNotFound(String),

    #[error("batch write failed after {attempts} attempts: {message}")]
    BatchFailed { attempts: u32, message: String },

    #[error("subgraph traversal exceeded node cap ({cap})")]
    TraversalCapExceeded { cap: usize },
}

/// Errors from the Parser and Language Analyzers.
#[derive(Error, Debug)]
pub enum ParserError {
    #[error("unsupported language for file '{0}'")]
    UnsupportedLanguage(PathBuf),

    #[error("tree-sitter failed to parse '{0}'")]
    ParseFailed(PathBuf),

    #[error("recursion depth exceeded ({depth}) while analyzing '{path}'")]
    RecursionLimitExceeded { path: PathBuf, depth: usize },

    #[error("analysis of '{path}' exceeded the wall-clock timeout ({timeout_ms}ms)")]
    Timeout { path: PathBuf, timeout_ms: u64 },

    #[error("io error reading '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
