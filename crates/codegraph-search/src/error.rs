//! Error types for codegraph-search.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("graph store error: {0}")]
    GraphStore(#[from] codegraph_core::GraphStoreError),

    #[error("vector index error: {0}")]
    Vector(#[from] codegraph_vector::VectorError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("embedding error: {0}")]
    Embedding(String),

    #[error("embedding provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Azure ML authentication failed: {0}")]
    AzureMLAuth(String),

    #[error("Azure ML rate limited, retry after {retry_after:?} seconds")]
    AzureMLRateLimit { retry_after: Option<u64> },

    #[error("Azure ML request timed out")]
    AzureMLTimeout,

    #[error("OpenAI authentication failed: {0}")]
    OpenAIAuth(String),

    #[error("OpenAI rate limited, retry after {retry_after:?} seconds")]
    OpenAIRateLimit { retry_after: Option<u64> },

    #[error("OpenAI model not found: {0}")]
    OpenAIInvalidModel(String),

    #[error("entity not found: {0}")]
    EntityNotFound(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<candle_core::Error> for SearchError {
    fn from(err: candle_core::Error) -> Self {
        SearchError::Embedding(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SearchError>;
