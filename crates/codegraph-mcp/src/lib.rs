//! codegraph-mcp - MCP server exposing the code graph engine's tool-call
//! interface to AI assistants.
//!
//! Wires together the storage engine, indexer, structural query engine,
//! semantic engine, and agent coordinator behind 16 `rmcp` tools: indexing,
//! structural navigation, free-text and semantic search, clone/refactoring
//! analysis, hotspot/impact analysis, and graph lifecycle management.

pub mod error;
pub mod server;
pub mod tools;

// Re-exports
pub use error::{McpError, Result};
pub use server::{CodeGraphServer, ServerConfig};
