//! Search command - semantic search over the vector index

use anyhow::Result;
use clap::Args;
use rmcp::handler::server::wrapper::Parameters;

use super::{build_server, print_info, print_json, tool_json};
use crate::GlobalOptions;

/// Arguments for the search command
#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Natural-language or conceptual query
    query: String,

    /// Maximum number of results
    #[arg(long, short = 'n', default_value = "10")]
    limit: usize,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Execute the search command
pub async fn execute(args: SearchArgs, global: GlobalOptions) -> Result<()> {
    let server = build_server(&global).await?;
    let result = server
        .semantic_search(Parameters(codegraph_mcp::tools::SemanticSearchParams {
            query: args.query.clone(),
            limit: Some(args.limit),
        }))
        .await?;
    let value = tool_json(&result)?;
    let hits = value["results"].as_array().cloned().unwrap_or_default();

    if args.json {
        return print_json(&value);
    }

    if hits.is_empty() {
        print_info(&format!("no semantic matches for \"{}\"", args.query), global.quiet);
        return Ok(());
    }

    for hit in &hits {
        let entity = &hit["entity"];
        println!(
            "{:.3}  {} ({})  {}",
            hit["score"].as_f64().unwrap_or(0.0),
            entity["name"].as_str().unwrap_or("?"),
            entity["entity_type"].as_str().unwrap_or("?"),
            entity["file_path"].as_str().unwrap_or("?")
        );
    }
    Ok(())
}
