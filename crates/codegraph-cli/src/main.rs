//! codegraph CLI - local code-graph engine: indexing, structural and
//! semantic queries, and an MCP server for AI assistant integration.
//!
//! # Usage
//!
//! ```bash
//! # Index the current directory into .codegraph/graph.db
//! codegraph index
//!
//! # Free-text structural search over entity names/signatures
//! codegraph query "parse_config"
//!
//! # Meaning-based search
//! codegraph search "reading configuration from a file path"
//!
//! # Serve the MCP tool-call interface over stdio
//! codegraph mcp
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

mod commands;
mod progress;

/// codegraph - local code-graph engine CLI
#[derive(Parser, Debug)]
#[command(name = "codegraph")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOptions,
}

/// Global options available to all commands
#[derive(Args, Debug, Clone)]
struct GlobalOptions {
    /// Repository root to operate on (default: current directory)
    #[arg(long, short = 'r', global = true, env = "CODEGRAPH_REPO")]
    repo: Option<PathBuf>,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    quiet: bool,
}

impl GlobalOptions {
    /// Resolve the repository root: `--repo`, else the current directory.
    fn repo_path(&self) -> anyhow::Result<PathBuf> {
        let path = match &self.repo {
            Some(path) => path.clone(),
            None => std::env::current_dir()?,
        };
        path.canonicalize().map_err(Into::into)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// (Re-)index a directory into the code graph
    Index(commands::index::IndexArgs),

    /// Free-text structural search over entity names and signatures
    Query(commands::query::QueryArgs),

    /// Semantic search over the vector index
    Search(commands::search::SearchArgs),

    /// Reverse-dependency impact analysis for an entity
    Impact(commands::impact::ImpactArgs),

    /// Show graph health and coordinator metrics
    Status(commands::status::StatusArgs),

    /// Delete the persisted graph, optionally re-indexing afterward
    Clean(commands::clean::CleanArgs),

    /// Start the MCP server for AI assistant integration (stdio transport)
    Mcp(commands::mcp::McpArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = if cli.global.quiet {
        Level::ERROR
    } else if cli.global.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    // The `mcp` command sets up its own tracing (stdout is reserved for the
    // JSON-RPC protocol, and a host like Claude Code may already have set a
    // global subscriber).
    if !matches!(cli.command, Commands::Mcp(_)) {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .finish();
        if tracing::subscriber::set_global_default(subscriber).is_err() {
            eprintln!("warning: a tracing subscriber was already installed");
        }
    }

    let result = match cli.command {
        Commands::Index(args) => commands::index::execute(args, cli.global).await,
        Commands::Query(args) => commands::query::execute(args, cli.global).await,
        Commands::Search(args) => commands::search::execute(args, cli.global).await,
        Commands::Impact(args) => commands::impact::execute(args, cli.global).await,
        Commands::Status(args) => commands::status::execute(args, cli.global).await,
        Commands::Clean(args) => commands::clean::execute(args, cli.global).await,
        Commands::Mcp(args) => commands::mcp::execute(args, cli.global).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
