//! Index command - (re-)index a directory into the code graph

use anyhow::Result;
use clap::Args;
use rmcp::handler::server::wrapper::Parameters;

use super::{build_server, print_info, print_json, tool_json};
use crate::progress;
use crate::GlobalOptions;

/// Arguments for the index command
#[derive(Args, Debug)]
pub struct IndexArgs {
    /// Directory to index, relative to the repository root (default: root)
    directory: Option<String>,

    /// Force a full re-parse instead of skipping unchanged files
    #[arg(long)]
    full: bool,

    /// Additional glob patterns to exclude
    #[arg(long = "exclude")]
    exclude_patterns: Vec<String>,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Execute the index command
pub async fn execute(args: IndexArgs, global: GlobalOptions) -> Result<()> {
    let server = build_server(&global).await?;
    let spinner = progress::spinner("Indexing...", global.quiet);

    let exclude_patterns = if args.exclude_patterns.is_empty() { None } else { Some(args.exclude_patterns) };
    let result = server
        .index(Parameters(codegraph_mcp::tools::IndexParams {
            directory: args.directory,
            incremental: Some(!args.full),
            exclude_patterns,
        }))
        .await?;
    let summary = tool_json(&result)?;

    if args.json {
        progress::finish_progress(spinner);
        print_json(&summary)?;
        return Ok(());
    }

    let stats = &summary["summary"];
    progress::finish_spinner(
        spinner,
        &format!(
            "indexed {} file(s), skipped {}, failed {} ({} ms)",
            stats["total_indexed"], stats["total_skipped"], stats["total_failed"], stats["elapsed_ms"]
        ),
    );
    print_info(
        &format!(
            "entities written: {}, relationships written: {}",
            stats["entities_written"], stats["relationships_written"]
        ),
        global.quiet,
    );
    Ok(())
}
