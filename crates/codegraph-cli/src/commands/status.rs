//! Status command - graph health and coordinator metrics

use anyhow::Result;
use clap::Args;
use rmcp::handler::server::wrapper::Parameters;

use super::{build_server, print_json, tool_json};
use crate::GlobalOptions;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Number of sample entities to include
    #[arg(long, default_value = "5")]
    sample: usize,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Execute the status command
pub async fn execute(args: StatusArgs, global: GlobalOptions) -> Result<()> {
    let server = build_server(&global).await?;

    let health_result = server
        .get_graph_health(Parameters(codegraph_mcp::tools::GetGraphHealthParams {
            min_entities: Some(1),
            sample: Some(args.sample),
        }))
        .await?;
    let health = tool_json(&health_result)?;

    let metrics_result = server.get_metrics(Parameters(codegraph_mcp::tools::GetMetricsParams {})).await?;
    let metrics = tool_json(&metrics_result)?;

    if args.json {
        return print_json(&serde_json::json!({ "health": health, "metrics": metrics }));
    }

    let repo_path = global.repo_path()?;
    println!("repository: {}", repo_path.display());
    println!(
        "graph: {} entities, {} relationships, {} files (healthy: {})",
        health["totals"]["entities"], health["totals"]["relationships"], health["totals"]["files"], health["healthy"]
    );
    println!(
        "coordinator: {} submitted, {} completed, {} timed out, {} backpressured, {} stuck incident(s)",
        metrics["conductor"]["submitted"],
        metrics["conductor"]["completed"],
        metrics["conductor"]["timed_out"],
        metrics["conductor"]["backpressured"],
        metrics["conductor"]["stuck_incidents"],
    );
    Ok(())
}
