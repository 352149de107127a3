//! margin-mcp: comment-thread tools for coding agents over MCP stdio.
//!
//! Shares the workspace database with the `margin` terminal UI. Each tool call
//! first syncs with whatever the UI committed, then applies its change and
//! writes the full thread list back.
//!
//! Add to an MCP client configuration:
//! ```json
//! { "mcpServers": { "margin": { "command": "margin-mcp" } } }
//! ```

mod server;

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use margin_core::config::Config;
use margin_core::root::{discover_root, PathResolver};
use margin_core::tools::Facade;
use margin_core::workspace::Workspace;
use rmcp::transport::stdio;
use rmcp::ServiceExt;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "margin-mcp", about = "MCP server for line-anchored code comments")]
struct Args {
    /// Workspace root; relative tool paths resolve against it.
    #[arg(long)]
    root: Option<PathBuf>,
    /// Database file (default: <root>/.margin/comments.db).
    #[arg(long)]
    db: Option<PathBuf>,
    /// Author for tool calls that omit `username`.
    #[arg(long)]
    author: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let (config, config_problem) = Config::load();

    // stdout carries JSON-RPC; logs go to stderr only.
    let filter = EnvFilter::try_from_env("MARGIN_LOG")
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
    if let Some(problem) = config_problem {
        tracing::warn!("{problem}; using defaults");
    }

    let cwd = std::env::current_dir().context("cannot read current directory")?;
    let root = discover_root(args.root.as_deref().or(config.root.as_deref()), &cwd);
    let db_path = match args.db {
        Some(p) => p,
        None => config.database_path(&root),
    };
    if let Some(dir) = db_path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("cannot create {}", dir.display()))?;
    }

    let conn = margin_core::db::open_db_shared(&db_path.to_string_lossy())
        .await
        .with_context(|| format!("cannot open {}", db_path.display()))?;
    let (workspace, skipped) = Workspace::open(conn).await?;
    if !skipped.is_empty() {
        tracing::warn!(count = skipped.len(), "some comment threads could not be restored");
    }

    let author = args.author.unwrap_or(config.author);
    let facade = Facade::new(PathResolver::new(&root), author);
    tracing::info!(root = %root.display(), db = %db_path.display(), "starting margin MCP server");

    let service = server::MarginMcp::new(workspace, facade).serve(stdio()).await?;
    service.waiting().await?;

    tracing::info!("margin MCP server stopped");
    Ok(())
}
