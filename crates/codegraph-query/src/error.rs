use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("graph store error: {0}")]
    GraphStore(#[from] codegraph_core::GraphStoreError),

    #[error("entity '{0}' not found")]
    EntityNotFound(String),

    #[error("query exceeded its time budget")]
    TimedOut,
}

pub type QueryResult<T> = Result<T, QueryError>;
