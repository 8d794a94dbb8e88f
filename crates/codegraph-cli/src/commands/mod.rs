//! CLI command implementations
//!
//! Every command builds a [`CodeGraphServer`] rooted at the resolved
//! repository path and drives it through the same tool methods the MCP
//! transport calls, so the CLI and the MCP server never diverge in
//! behavior.

pub mod clean;
pub mod impact;
pub mod index;
pub mod mcp;
pub mod query;
pub mod search;
pub mod status;

use anyhow::{Context, Result};
use codegraph_mcp::{CodeGraphServer, ServerConfig};
use rmcp::model::{CallToolResult, RawContent};

use crate::GlobalOptions;

/// Build a server rooted at the resolved `--repo` path.
pub async fn build_server(global: &GlobalOptions) -> Result<CodeGraphServer> {
    let repo_path = global.repo_path().context("failed to resolve repository path")?;
    CodeGraphServer::new(ServerConfig::new(&repo_path))
        .await
        .with_context(|| format!("failed to open graph store under {}", repo_path.display()))
}

/// Pull the JSON payload out of a tool call's text content, for either
/// pretty-printing or reformatting into the CLI's own text output.
pub fn tool_json(result: &CallToolResult) -> Result<serde_json::Value> {
    let text = match result.content.first().map(|c| &c.raw) {
        Some(RawContent::Text(t)) => t.text.as_str(),
        _ => anyhow::bail!("tool call returned no text content"),
    };
    serde_json::from_str(text).context("tool call returned malformed JSON")
}

pub fn print_info(message: &str, quiet: bool) {
    if !quiet {
        eprintln!("{message}");
    }
}

pub fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
