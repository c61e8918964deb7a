//! Neovim MCP Server Library
//!
//! This library contains the MCP protocol layer: tool parameter types, the
//! request router and server construction. The actual server binary is in
//! main.rs.

pub mod protocol;
pub mod startup;
pub mod tools;

// Re-export commonly used types
pub use protocol::NvimMcpServer;
pub use startup::{build_server, load_config, CliArgs};
pub use tools::*;
