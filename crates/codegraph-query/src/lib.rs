//! codegraph-query - structural query engine over the code graph.
//!
//! A thin, cached facade over [`codegraph_core::GraphStore`]: file/entity
//! listings, bounded relationship/subgraph traversal, hotspot ranking, and
//! reverse-dependency impact analysis. Every operation's JSON-shaped result
//! is cached by canonical-JSON request key with a 5 minute TTL.

pub mod cache;
pub mod engine;
pub mod error;

pub use cache::ResultCache;
pub use engine::{HotspotMetric, QueryEngine};
pub use error::{QueryError, QueryResult};
