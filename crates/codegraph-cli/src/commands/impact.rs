//! Impact command - reverse-dependency analysis for an entity

use anyhow::Result;
use clap::Args;
use rmcp::handler::server::wrapper::Parameters;

use super::{build_server, print_info, print_json, tool_json};
use crate::GlobalOptions;

/// Arguments for the impact command
#[derive(Args, Debug)]
pub struct ImpactArgs {
    /// ID of the entity whose dependents should be traced
    entity_id: String,

    /// Traversal depth
    #[arg(long, default_value = "2")]
    depth: usize,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Execute the impact command
pub async fn execute(args: ImpactArgs, global: GlobalOptions) -> Result<()> {
    let server = build_server(&global).await?;
    let result = server
        .analyze_code_impact(Parameters(codegraph_mcp::tools::AnalyzeCodeImpactParams {
            entity_id: args.entity_id.clone(),
            depth: Some(args.depth),
        }))
        .await?;
    let value = tool_json(&result)?;

    if args.json {
        return print_json(&value);
    }

    let impacted = value["impacted"].as_array().cloned().unwrap_or_default();
    if impacted.is_empty() {
        print_info(&format!("nothing depends on {}", args.entity_id), global.quiet);
        return Ok(());
    }

    println!("{} entit(y/ies) depend on {}:", impacted.len(), args.entity_id);
    for entity in &impacted {
        println!("  {} ({})  {}", entity["name"].as_str().unwrap_or("?"), entity["entity_type"].as_str().unwrap_or("?"), entity["file_path"].as_str().unwrap_or("?"));
    }
    Ok(())
}
