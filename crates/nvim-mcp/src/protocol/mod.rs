//! MCP Protocol Layer
//!
//! This module implements the Model Context Protocol server using rmcp 0.9.
//! It exposes the editor's state and editing operations as MCP tools and
//! resources.

pub mod server;

pub use server::{NvimMcpServer, BUFFERS_URI, SESSION_URI};
