//! # nvim-mcp-rpc
//!
//! msgpack-RPC plumbing for talking to a running Neovim.
//!
//! This crate provides:
//! - Message framing and incremental decoding
//! - A request/response client over Unix sockets or TCP
//! - Typed wrappers for the `nvim_*` API methods the server uses
//! - An in-memory fake editor for tests
//!
//! ## Architecture
//!
//! This is Layer 1 in the architecture - it depends only on nvim-mcp-core
//! and knows nothing about MCP.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod client;
pub mod codec;
pub mod testing;
pub mod value;

// Re-export commonly used types
pub use api::{Nvim, CURRENT};
pub use client::{Connector, MsgpackClient, RpcClient, SocketConnector};
pub use codec::{Decoder, Message};
