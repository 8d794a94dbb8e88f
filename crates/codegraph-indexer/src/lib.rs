//! codegraph-indexer - repository discovery and batch/incremental indexing
//! into the code graph.
//!
//! Walks a directory tree with `.gitignore`-aware discovery, hashes each
//! file's content to skip unchanged files on re-index, and writes parsed
//! entities/relationships into a [`codegraph_core::GraphStore`] inside a
//! per-file transaction. Publishes a `new_entities` broadcast event per
//! indexed file so the semantic embedding layer can consume work
//! incrementally rather than re-scanning the whole graph.

pub mod discovery;
pub mod error;
pub mod indexer;

pub use discovery::discover_files;
pub use error::{IndexError, IndexResult};
pub use indexer::{IndexStats, Indexer, NewEntitiesEvent};
