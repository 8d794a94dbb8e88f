//! codegraph-coordinator - priority-queued task scheduling across reused
//! agent worker pools (parser, indexer, query, semantic, dev, research),
//! with resource-aware pool scaling, per-task deadlines, backpressure, and
//! a stuck-task watchdog.

pub mod coordinator;
pub mod error;
pub mod metrics;
pub mod pool;
pub mod resource;
pub mod task;

pub use coordinator::Coordinator;
pub use error::{CoordinatorError, CoordinatorResult};
pub use metrics::MetricsSnapshot;
pub use task::AgentKind;
