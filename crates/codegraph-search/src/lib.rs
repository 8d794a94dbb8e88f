//! codegraph-search - the semantic engine: composes searchable text for
//! graph entities, embeds it through a pluggable provider, and serves
//! semantic/similarity/clone/refactoring queries by combining vector
//! search with graph context.
//!
//! [`SemanticEngine`] is the facade most callers use. The lower-level
//! pieces (`embeddings`, `semantic_text`, `hybrid`, `clone_detection`,
//! `refactoring`) are public for composition and testing.

pub mod clone_detection;
pub mod embeddings;
pub mod engine;
pub mod error;
pub mod hybrid;
pub mod refactoring;
pub mod semantic_text;

pub use clone_detection::{CloneCluster, ClonePair, CloneScope};
pub use embeddings::{create_provider, EmbeddingProvider, ProviderStatus, EMBEDDING_DIM};
pub use engine::{SemanticEngine, SemanticSearchResult};
pub use error::{Result, SearchError};
pub use hybrid::{hybrid_score, structural_score, BreakerProvider, HybridSearchHit};
pub use refactoring::{Focus, RefactoringSuggestion};
pub use semantic_text::SemanticTextBuilder;
