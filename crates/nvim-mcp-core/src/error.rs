//! Error types for the Neovim MCP Server.

use thiserror::Error;

/// Main error type for Neovim MCP operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Could not reach the editor at the configured address
    #[error("Failed to connect to Neovim at {address}: {reason}")]
    Connection {
        /// Socket path or host:port that was dialed
        address: String,
        /// Underlying cause
        reason: String,
    },

    /// msgpack-RPC framing or protocol violation
    #[error("RPC error: {0}")]
    Rpc(String),

    /// The editor answered a request with an error response
    #[error("Neovim error: {0}")]
    Remote(String),

    /// No response within the configured request timeout
    #[error("Timeout waiting for Neovim after {0}ms")]
    Timeout(u64),

    /// Reply had a shape the adapter does not understand
    #[error("Unexpected response from {method}: {detail}")]
    UnexpectedResponse {
        /// RPC method that produced the reply
        method: String,
        /// What was wrong with it
        detail: String,
    },

    /// Mark name outside `[a-z]`
    #[error("Invalid mark: {0}. Mark must be a single lowercase letter (a-z)")]
    InvalidMark(String),

    /// Register name outside `[a-z"]`
    #[error("Invalid register: {0}. Register must be a lowercase letter (a-z) or '\"'")]
    InvalidRegister(String),

    /// Window command not on the allow-list
    #[error("Invalid window command: {0}")]
    InvalidWindowCommand(String),

    /// Line number outside the 1-indexed range
    #[error("Invalid line number: {0}. Lines are 1-indexed")]
    InvalidLine(u64),

    /// Shell execution requested while disabled
    #[error("Shell commands are disabled. Set ALLOW_SHELL_COMMANDS=true to enable them.")]
    ShellDisabled,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid input or parameters (generic)
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Whether the error was raised by input validation, before any editor call.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::InvalidMark(_)
                | Error::InvalidRegister(_)
                | Error::InvalidWindowCommand(_)
                | Error::InvalidLine(_)
                | Error::InvalidInput(_)
        )
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
