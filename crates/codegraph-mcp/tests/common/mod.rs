//! Common test utilities for codegraph-mcp integration tests.
//!
//! Provides helpers for setting up a small synthetic repository, building a
//! server against it, and reading tool-call JSON responses back out.

#![allow(dead_code)]

use std::path::PathBuf;
use tempfile::TempDir;

use codegraph_mcp::{CodeGraphServer, ServerConfig};
use rmcp::model::{CallToolResult, RawContent};

/// Write a tiny multi-file Rust "repository" to a fresh temp directory.
pub fn setup_fixture_repo() -> TempDir {
    let dir = TempDir::new().expect("failed to create temp dir");
    std::fs::write(
        dir.path().join("lib.rs"),
        "pub fn parse_config(path: &str) -> String {\n    read_file(path)\n}\n\nfn read_file(path: &str) -> String {\n    path.to_string()\n}\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("render.rs"),
        "pub fn render_view(data: &str) -> String {\n    data.to_string()\n}\n",
    )
    .unwrap();
    dir
}

/// Build a server rooted at `repo_path` with default engine settings.
pub async fn build_server(repo_path: PathBuf) -> CodeGraphServer {
    CodeGraphServer::new(ServerConfig::new(repo_path))
        .await
        .expect("failed to build server")
}

/// Extract the JSON text payload from a tool call's first content block.
pub fn response_json(result: &CallToolResult) -> serde_json::Value {
    let text = match &result.content[0].raw {
        RawContent::Text(t) => t.text.clone(),
        other => panic!("expected text content, got {:?}", other),
    };
    serde_json::from_str(&text).expect("tool response was not valid JSON")
}

/// Assert that a JSON response contains a specific field.
pub fn assert_field_exists(response: &serde_json::Value, field: &str) {
    assert!(
        response.get(field).is_some(),
        "expected field '{}' in response: {:?}",
        field,
        response
    );
}
