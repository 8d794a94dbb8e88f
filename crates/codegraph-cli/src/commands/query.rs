//! Query command - free-text structural search over entity names/signatures

use anyhow::Result;
use clap::Args;
use rmcp::handler::server::wrapper::Parameters;

use super::{build_server, print_info, print_json, tool_json};
use crate::GlobalOptions;

/// Arguments for the query command
#[derive(Args, Debug)]
pub struct QueryArgs {
    /// Free-text query matched against entity names/signatures
    query: String,

    /// Maximum number of results
    #[arg(long, short = 'n', default_value = "20")]
    limit: usize,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Execute the query command
pub async fn execute(args: QueryArgs, global: GlobalOptions) -> Result<()> {
    let server = build_server(&global).await?;
    let result = server
        .query(Parameters(codegraph_mcp::tools::QueryParams { query: args.query.clone(), limit: Some(args.limit) }))
        .await?;
    let value = tool_json(&result)?;
    let hits = value["results"].as_array().cloned().unwrap_or_default();

    if args.json {
        return print_json(&value);
    }

    if hits.is_empty() {
        print_info(&format!("no matches for \"{}\"", args.query), global.quiet);
        return Ok(());
    }

    for hit in &hits {
        println!(
            "{} ({})  {}",
            hit["name"].as_str().unwrap_or("?"),
            hit["entity_type"].as_str().unwrap_or("?"),
            hit["file_path"].as_str().unwrap_or("?")
        );
    }
    Ok(())
}
