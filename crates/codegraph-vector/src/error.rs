use thiserror::Error;

#[derive(Debug, Error)]
pub enum VectorError {
    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("storage error: {0}")]
    Storage(#[from] codegraph_core::StorageError),

    #[error("primary backend unavailable, running in fallback mode: {0}")]
    BackendUnavailable(String),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type VectorResult<T> = Result<T, VectorError>;
