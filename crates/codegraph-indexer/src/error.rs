use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("graph store error: {0}")]
    GraphStore(#[from] codegraph_core::GraphStoreError),

    #[error("parser error for '{path}': {source}")]
    Parser {
        path: PathBuf,
        #[source]
        source: codegraph_core::ParserError,
    },

    #[error("io error reading '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("walk error: {0}")]
    Walk(#[from] ignore::Error),
}

pub type IndexResult<T> = Result<T, IndexError>;
