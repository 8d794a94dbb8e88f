//! Error types for the MCP server

use thiserror::Error;

/// Result type for MCP operations
pub type Result<T> = std::result::Result<T, McpError>;

/// Errors that can occur in the MCP server
#[derive(Error, Debug)]
pub enum McpError {
    /// Graph store failed to load, write, or traverse
    #[error("graph store error: {0}")]
    GraphStore(#[from] codegraph_core::GraphStoreError),

    /// Entity not found in the graph
    #[error("entity not found: {0}")]
    EntityNotFound(String),

    /// File not found when reading code
    #[error("file not found: {0}")]
    FileNotFound(String),

    /// Structural query failed
    #[error("query error: {0}")]
    Query(#[from] codegraph_query::QueryError),

    /// Indexing pass failed
    #[error("index error: {0}")]
    Index(#[from] codegraph_indexer::IndexError),

    /// Coordinator rejected or failed a submitted task
    #[error("coordinator error: {0}")]
    Coordinator(#[from] codegraph_coordinator::CoordinatorError),

    /// Semantic search/embedding operation failed
    #[error("search error: {0}")]
    Search(#[from] codegraph_search::SearchError),

    /// Invalid parameters provided
    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal server error
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<McpError> for rmcp::ErrorData {
    fn from(err: McpError) -> Self {
        let message = err.to_string();
        match err {
            McpError::EntityNotFound(_)
            | McpError::FileNotFound(_)
            | McpError::InvalidParams(_)
            | McpError::Query(codegraph_query::QueryError::EntityNotFound(_))
            | McpError::Search(codegraph_search::SearchError::EntityNotFound(_)) => {
                rmcp::ErrorData::invalid_params(message, None)
            }
            _ => rmcp::ErrorData::internal_error(message, None),
        }
    }
}
