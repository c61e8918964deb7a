//! # Neovim MCP Server
//!
//! Model Context Protocol server that lets AI agents inspect and edit a
//! running Neovim instance.
//!
//! ## Overview
//!
//! This server provides MCP tools for:
//! - Buffer access (read, edit, open files, batched inserts)
//! - Command execution (Ex commands, opt-in shell commands)
//! - Editor state (status, marks, registers, visual selection)
//! - Window management (split, close, navigate)
//!
//! ## Architecture
//!
//! This is Layer 3 - the main MCP server binary that ties together:
//! - nvim-mcp-core: Core types and configuration
//! - nvim-mcp-rpc: msgpack-RPC connection to Neovim
//! - nvim-mcp-session: Session adapter

use nvim_mcp::{build_server, load_config, CliArgs};
use rmcp::{transport::stdio, ServiceExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = CliArgs::parse(std::env::args().skip(1))?;
    let config = load_config(&args, |key| std::env::var(key).ok())?;

    // Initialize logging; stdout belongs to the MCP transport
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.server.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!(
        "Neovim MCP Server v{} starting (socket: {}, shell commands: {})",
        env!("CARGO_PKG_VERSION"),
        config.neovim.socket_path,
        if config.security.allow_shell_commands {
            "enabled"
        } else {
            "disabled"
        }
    );

    let server = build_server(&config);

    tracing::info!("Server initialized, starting stdio transport...");

    // Serve the MCP server over stdio
    let service = server.serve(stdio()).await.map_err(|e| {
        tracing::error!("Error starting server: {}", e);
        e
    })?;

    tracing::info!("Neovim MCP Server running on stdio");

    // Wait for the service to complete
    service.waiting().await?;

    tracing::info!("Neovim MCP Server shutting down");

    Ok(())
}
