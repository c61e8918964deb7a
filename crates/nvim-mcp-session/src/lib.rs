//! # nvim-mcp-session
//!
//! The session adapter: the single point of contact with the editor.
//!
//! This crate provides:
//! - Buffer reads and line edits
//! - Ex command execution with error capture and the shell opt-in
//! - Status, window and buffer snapshots
//! - Marks, registers and visual selections
//!
//! ## Architecture
//!
//! This is Layer 2 in the architecture - it depends on nvim-mcp-core and
//! nvim-mcp-rpc. Every operation opens its own connection through a
//! [`nvim_mcp_rpc::Connector`] and returns an explicit `Result`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod command;
pub mod edit;
pub mod layout;
pub mod session;
pub mod state;
pub mod status;

// Re-export commonly used types
pub use command::{command_body, is_shell_command, CommandOutcome};
pub use edit::{EditPlan, InsertBlock};
pub use session::NvimSession;
