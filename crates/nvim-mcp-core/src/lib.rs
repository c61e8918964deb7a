//! # nvim-mcp-core
//!
//! Core types for the Neovim MCP Server.
//!
//! This crate contains all fundamental types with **no internal dependencies**
//! on other nvim-mcp crates. It provides:
//!
//! - Snapshot types mirrored from the editor (BufferContents, EditorStatus,
//!   BufferInfo, WindowInfo)
//! - Validated names (marks, registers, window commands, edit modes)
//! - Configuration types
//! - Error types
//!
//! ## Architecture
//!
//! This is Layer 0 in the architecture - all other crates depend on this one,
//! but this crate has no dependencies on other nvim-mcp crates.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod buffer;
pub mod config;
pub mod error;
pub mod layout;
pub mod names;
pub mod status;

// Re-export commonly used types
pub use buffer::BufferContents;
pub use config::{
    NeovimSettings, SecuritySettings, ServerConfig, ServerSettings, ALLOW_SHELL_ENV,
    DEFAULT_SOCKET_PATH, SOCKET_PATH_ENV,
};
pub use error::{Error, Result};
pub use layout::{BufferInfo, WindowInfo};
pub use names::{EditMode, MarkName, RegisterName, WindowCommand};
pub use status::{EditorStatus, MarkPosition};
