//! codegraph-vector - vector index for code entity embeddings.
//!
//! Two backends selected at startup: `sqlite-vec`'s `vec0` virtual table
//! for approximate nearest-neighbor search, falling back to a BLOB column
//! plus in-process cosine linear scan (with an LRU query cache) if the
//! extension fails to load. Dimension is fixed per [`VectorIndex`]; a
//! mismatched insert fails with [`VectorError::DimensionMismatch`].

pub mod backend;
pub mod error;
pub mod index;
pub mod scan;
pub mod sqlite_vec_backend;

pub use backend::{BackendKind, SearchFilter, SearchHit, VectorBackend, VectorStats};
pub use error::{VectorError, VectorResult};
pub use index::VectorIndex;
