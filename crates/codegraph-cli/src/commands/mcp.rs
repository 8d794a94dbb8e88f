//! MCP server command
//!
//! Starts the code graph MCP server for AI assistant integration over
//! stdio. Handles `SIGINT`/`SIGTERM` for graceful shutdown (draining the
//! coordinator's queues and letting in-flight work finish) and, on Unix,
//! `SIGUSR1` for an on-demand diagnostic dump of coordinator metrics.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use codegraph_mcp::{CodeGraphServer, ServerConfig};
use rmcp::{transport::stdio, ServiceExt};
use tokio::signal;
use tracing::{info, warn, Level};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::FmtSubscriber;

use crate::GlobalOptions;

/// Start the MCP server for AI assistant integration
#[derive(Args, Debug)]
pub struct McpArgs {
    /// Log file path (default: stderr)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

/// Execute the MCP server command
pub async fn execute(args: McpArgs, global: GlobalOptions) -> Result<()> {
    // stdout is reserved for the MCP JSON-RPC protocol - logging always goes
    // to stderr or a file.
    let log_level = if args.debug || global.verbose {
        Level::DEBUG
    } else if global.quiet {
        Level::ERROR
    } else {
        Level::INFO
    };

    if let Some(ref log_file) = args.log_file {
        let file = std::fs::File::create(log_file)
            .with_context(|| format!("failed to create log file: {}", log_file.display()))?;
        let subscriber = FmtSubscriber::builder().with_max_level(log_level).with_writer(file).with_ansi(false).finish();
        if subscriber.try_init().is_err() {
            warn!("a tracing subscriber was already installed; --log-file is ignored");
        }
    } else {
        let subscriber =
            FmtSubscriber::builder().with_max_level(log_level).with_writer(std::io::stderr).with_ansi(false).finish();
        let _ = subscriber.try_init();
    }

    let repo_path = global.repo_path().context("failed to resolve repository path")?;
    info!("Starting code graph MCP server");
    info!("  Repository: {}", repo_path.display());

    let server = CodeGraphServer::new(ServerConfig::new(&repo_path)).await.context("failed to create MCP server")?;
    let server_for_signals = server.clone();

    info!("Server initialized, starting MCP protocol over stdio");
    let service = server.serve(stdio()).await.context("failed to start MCP service")?;

    tokio::select! {
        result = service.waiting() => {
            match result {
                Ok(_) => info!("service ended normally"),
                Err(e) => info!("service ended with error: {e}"),
            }
        }
        _ = shutdown_signal() => {
            info!("shutdown signal received, draining queues");
            server_for_signals.shutdown();
        }
        _ = diagnostic_dump_signal() => {
            let metrics = server_for_signals.get_metrics(rmcp::handler::server::wrapper::Parameters(
                codegraph_mcp::tools::GetMetricsParams {},
            )).await;
            info!("SIGUSR1 diagnostic dump: {:?}", metrics);
        }
    }

    info!("server shutdown complete");
    Ok(())
}

/// Wait for a graceful-shutdown signal (`SIGTERM` or `Ctrl+C`).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Wait for `SIGUSR1` (Unix only; never resolves elsewhere).
#[cfg(unix)]
async fn diagnostic_dump_signal() {
    signal::unix::signal(signal::unix::SignalKind::user_defined1())
        .expect("failed to install SIGUSR1 handler")
        .recv()
        .await;
}

#[cfg(not(unix))]
async fn diagnostic_dump_signal() {
    std::future::pending::<()>().await
}
