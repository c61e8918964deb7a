//! MCP Tool Parameter Types
//!
//! Parameter structs for every tool. Field names are camelCase on the wire;
//! the generated JSON Schemas carry the enums, patterns and ranges that the
//! server also enforces before talking to the editor.

use schemars::{json_schema, JsonSchema, Schema, SchemaGenerator};
use serde::{Deserialize, Serialize};

use nvim_mcp_core::{EditMode, WindowCommand};
use nvim_mcp_session::InsertBlock;

fn window_command_schema(_: &mut SchemaGenerator) -> Schema {
    json_schema!({
        "type": "string",
        "enum": WindowCommand::ALLOWED,
        "description": "Window command to execute"
    })
}

fn mark_schema(_: &mut SchemaGenerator) -> Schema {
    json_schema!({
        "type": "string",
        "pattern": "^[a-z]$",
        "description": "Single lowercase letter a-z"
    })
}

fn register_schema(_: &mut SchemaGenerator) -> Schema {
    json_schema!({
        "type": "string",
        "pattern": "^[a-z\"]$",
        "description": "Register name: a-z or \""
    })
}

// =============================================================================
// Buffer Tools
// =============================================================================

/// Parameters for vim_buffer
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct BufferParams {
    /// Optional file name to view (the current buffer is always returned)
    #[serde(default)]
    pub filename: Option<String>,
}

/// Parameters for vim_edit
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EditParams {
    /// The line number to start editing (1-indexed)
    #[schemars(range(min = 1))]
    pub start_line: u64,

    /// Type of edit: insert, replace, or replaceAll
    pub mode: EditMode,

    /// The text content to insert or replace with
    pub lines: String,
}

/// Parameters for vim_open
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OpenParams {
    /// Path of the file to open in the current window
    pub path: String,
}

/// One block for vim_insert_multiple
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InsertEntry {
    /// Line to insert before (1-indexed, relative to the buffer before any insert)
    #[schemars(range(min = 1))]
    pub start_line: u64,

    /// Text to insert
    pub content: String,
}

impl From<InsertEntry> for InsertBlock {
    fn from(entry: InsertEntry) -> Self {
        InsertBlock {
            start_line: entry.start_line,
            content: entry.content,
        }
    }
}

/// Parameters for vim_insert_multiple
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct InsertMultipleParams {
    /// Blocks to insert, in order
    pub inserts: Vec<InsertEntry>,
}

/// Parameters for vim_buffers
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct BuffersParams {}

// =============================================================================
// Command Tools
// =============================================================================

/// Parameters for vim_command
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CommandParams {
    /// Vim command to execute (use ! prefix for shell commands if enabled)
    pub command: String,
}

/// Parameters for vim_pwd
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct PwdParams {}

/// Parameters for vim_find_file
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FindFileParams {
    /// Part of the file name to search for
    pub filename: String,
}

/// Parameters for vim_file_tree
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct FileTreeParams {}

// =============================================================================
// State Tools
// =============================================================================

/// Parameters for vim_status
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct StatusParams {
    /// Optional file name (status is always for the current buffer)
    #[serde(default)]
    pub filename: Option<String>,
}

/// Parameters for vim_mark
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MarkParams {
    /// Mark name
    #[schemars(schema_with = "mark_schema")]
    pub mark: String,

    /// The line number (1-indexed)
    pub line: i64,

    /// The column number (0-indexed)
    pub column: i64,
}

/// Parameters for vim_register
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RegisterParams {
    /// Register name
    #[schemars(schema_with = "register_schema")]
    pub register: String,

    /// The content to store in the register
    pub content: String,
}

/// Parameters for vim_visual
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VisualParams {
    /// Starting line number (1-indexed)
    pub start_line: i64,

    /// Starting column number (0-indexed)
    pub start_column: i64,

    /// Ending line number (1-indexed)
    pub end_line: i64,

    /// Ending column number (0-indexed)
    pub end_column: i64,
}

// =============================================================================
// Window Tools
// =============================================================================

/// Parameters for vim_window
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WindowParams {
    /// Window command to execute
    #[schemars(schema_with = "window_command_schema")]
    pub command: String,
}

/// Parameters for vim_windows
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct WindowsParams {}
