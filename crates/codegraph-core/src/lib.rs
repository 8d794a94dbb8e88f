//! codegraph-core - data model, storage engine, and tree-sitter language
//! analyzers for the code graph engine.
//!
//! - Tree-sitter AST parsing for multiple languages
//! - Deterministic content-addressed IDs for entities and relationships
//! - Single-writer SQLite storage engine with schema migrations
//! - Graph Store: typed CRUD with batch upsert and bounded subgraph traversal
//! - Per-language analyzers behind a shared `Analyzer` trait

pub mod analyzers;
pub mod breaker;
pub mod complexity;
pub mod error;
pub mod graph_store;
pub mod ids;
pub mod model;
pub mod parser;
pub mod storage;

pub use error::{GraphStoreError, ParserError, StorageError};
pub use graph_store::{BatchResult, GraphHealth, GraphStore};
pub use ids::{content_hash, entity_id, file_digest, relationship_id};
pub use model::{
    Embedding, Entity, EntityType, FileRecord, Location, ParseResult, Position, Relationship,
    RelationshipType,
};
pub use parser::{CodeParser, ParseCache, SupportedLanguage};
pub use storage::{Storage, StorageFactory};

pub use analyzers::{AnalysisContext, Analyzer};
