//! Clean command - delete the persisted graph, optionally re-indexing after

use std::io::{self, Write};

use anyhow::Result;
use clap::Args;
use rmcp::handler::server::wrapper::Parameters;

use super::{build_server, print_info, print_json, tool_json};
use crate::GlobalOptions;

/// Arguments for the clean command
#[derive(Args, Debug)]
pub struct CleanArgs {
    /// Skip the confirmation prompt
    #[arg(long, short = 'f')]
    force: bool,

    /// Re-index this directory immediately after clearing the graph
    #[arg(long)]
    reindex: Option<String>,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Execute the clean command
pub async fn execute(args: CleanArgs, global: GlobalOptions) -> Result<()> {
    let repo_path = global.repo_path()?;

    if !args.force && !confirm(&format!("Delete the persisted graph under {}? [y/N] ", repo_path.display()))? {
        print_info("aborted", global.quiet);
        return Ok(());
    }

    let server = build_server(&global).await?;
    let result = server
        .reset_graph(Parameters(codegraph_mcp::tools::ResetGraphParams { directory: args.reindex }))
        .await?;
    let value = tool_json(&result)?;

    if args.json {
        return print_json(&value);
    }
    print_info("graph cleared", global.quiet);
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(matches!(line.trim().to_lowercase().as_str(), "y" | "yes"))
}
