//! Neovim MCP Server Implementation
//!
//! This module implements the MCP server using rmcp 0.9's #[tool_router] pattern.
//! It validates and authorizes tool calls, routes them to the session adapter
//! and wraps the results in MCP envelopes.

use std::sync::Arc;

use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::*,
    service::{RequestContext, RoleServer},
    tool, tool_handler, tool_router, ErrorData as McpError,
};
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

use nvim_mcp_core::{Error, MarkName, RegisterName, WindowCommand};
use nvim_mcp_session::{is_shell_command, CommandOutcome, InsertBlock, NvimSession};

use crate::tools::*;

/// URI of the current-buffer resource.
pub const SESSION_URI: &str = "nvim://session";
/// URI of the open-buffers resource.
pub const BUFFERS_URI: &str = "nvim://buffers";

/// Tool result carrying one text block.
fn text_result(text: impl Into<String>) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::success(vec![Content::text(text.into())]))
}

/// Tool result for an adapter failure.
///
/// Validation errors keep their own message; everything else is prefixed.
fn error_result(err: &Error) -> Result<CallToolResult, McpError> {
    let message = if err.is_validation() {
        err.to_string()
    } else {
        format!("Error: {err}")
    };
    Ok(CallToolResult::error(vec![Content::text(message)]))
}

fn pretty_json<T: Serialize>(value: &T) -> nvim_mcp_core::Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Tool result carrying `value` as pretty-printed JSON.
fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    match pretty_json(value) {
        Ok(json) => text_result(json),
        Err(e) => error_result(&e),
    }
}

/// Neovim MCP Server
///
/// Exposes a running Neovim as MCP tools and resources.
#[derive(Clone)]
pub struct NvimMcpServer {
    /// Adapter for the editor
    session: Arc<NvimSession>,
    /// Tool router for handling MCP tool calls
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl NvimMcpServer {
    /// Create a server that talks to the editor through `session`
    pub fn new(session: Arc<NvimSession>) -> Self {
        Self {
            session,
            tool_router: Self::tool_router(),
        }
    }

    /// The adapter this server routes to
    pub fn session(&self) -> &NvimSession {
        &self.session
    }

    fn shell_disabled(&self) -> Result<CallToolResult, McpError> {
        warn!("Shell command refused, shell commands are disabled");
        text_result(CommandOutcome::ShellDisabled.to_string())
    }

    /// Get the contents of the current buffer
    #[tool(
        description = "Get buffer contents with line numbers. Returns the current buffer as numbered lines."
    )]
    #[instrument(skip_all)]
    async fn vim_buffer(
        &self,
        Parameters(params): Parameters<BufferParams>,
    ) -> Result<CallToolResult, McpError> {
        debug!("Reading current buffer (filename hint: {:?})", params.filename);

        match self.session.get_buffer_contents().await {
            Ok(contents) => {
                info!("Buffer read: {} line(s)", contents.len());
                text_result(contents.to_string())
            }
            Err(e) => error_result(&e),
        }
    }

    /// Execute an Ex command
    #[tool(
        description = "Execute a Vim command. Use ! prefix for shell commands if enabled (ALLOW_SHELL_COMMANDS=true)."
    )]
    #[instrument(skip_all)]
    async fn vim_command(
        &self,
        Parameters(params): Parameters<CommandParams>,
    ) -> Result<CallToolResult, McpError> {
        info!("vim_command: {}", params.command);

        if is_shell_command(&params.command) && !self.session.allow_shell() {
            return self.shell_disabled();
        }

        match self.session.send_command(&params.command).await {
            Ok(outcome) => {
                if outcome.is_error() {
                    warn!("Command reported an editor error: {}", outcome);
                }
                text_result(outcome.to_string())
            }
            Err(e) => error_result(&e),
        }
    }

    /// Get the editor status snapshot
    #[tool(
        description = "Get the current status of Neovim: cursor position, mode, file name, visual selection, window layout, current tab, marks, registers and working directory."
    )]
    #[instrument(skip_all)]
    async fn vim_status(
        &self,
        Parameters(_params): Parameters<StatusParams>,
    ) -> Result<CallToolResult, McpError> {
        debug!("Collecting editor status");

        match self.session.get_status().await {
            Ok(status) => {
                info!(
                    "Status: mode={}, cursor={:?}, {} mark(s), {} register(s)",
                    status.mode,
                    status.cursor_position,
                    status.marks.len(),
                    status.registers.len()
                );
                json_result(&status)
            }
            Err(e) => error_result(&e),
        }
    }

    /// Insert or replace lines
    #[tool(
        description = "Edit buffer content. mode=insert inserts before startLine, mode=replace replaces from startLine to the end of the buffer, mode=replaceAll replaces the whole buffer."
    )]
    #[instrument(skip_all)]
    async fn vim_edit(
        &self,
        Parameters(params): Parameters<EditParams>,
    ) -> Result<CallToolResult, McpError> {
        info!("vim_edit: mode={}, startLine={}", params.mode, params.start_line);

        if params.start_line == 0 {
            return error_result(&Error::InvalidLine(0));
        }

        match self
            .session
            .edit_lines(params.start_line, params.mode, &params.lines)
            .await
        {
            Ok(message) => text_result(message),
            Err(e) => error_result(&e),
        }
    }

    /// Run an allow-listed window command
    #[tool(
        description = "Manage Neovim windows: split, vsplit, only, close, wincmd h/j/k/l."
    )]
    #[instrument(skip_all)]
    async fn vim_window(
        &self,
        Parameters(params): Parameters<WindowParams>,
    ) -> Result<CallToolResult, McpError> {
        info!("vim_window: {}", params.command);

        if let Err(e) = WindowCommand::parse(&params.command) {
            warn!("Rejected window command: {}", params.command);
            return error_result(&e);
        }

        match self.session.manipulate_window(&params.command).await {
            Ok(message) => text_result(message),
            Err(e) => error_result(&e),
        }
    }

    /// Set a mark at a position
    #[tool(description = "Set a mark (a-z) at a specific line and column.")]
    #[instrument(skip_all)]
    async fn vim_mark(
        &self,
        Parameters(params): Parameters<MarkParams>,
    ) -> Result<CallToolResult, McpError> {
        info!(
            "vim_mark: '{}' at {}:{}",
            params.mark, params.line, params.column
        );

        if let Err(e) = MarkName::parse(&params.mark) {
            return error_result(&e);
        }

        match self
            .session
            .set_mark(&params.mark, params.line, params.column)
            .await
        {
            Ok(message) => text_result(message),
            Err(e) => error_result(&e),
        }
    }

    /// Write a register
    #[tool(description = "Set the content of a register (a-z or \").")]
    #[instrument(skip_all)]
    async fn vim_register(
        &self,
        Parameters(params): Parameters<RegisterParams>,
    ) -> Result<CallToolResult, McpError> {
        info!(
            "vim_register: '{}' ({} bytes)",
            params.register,
            params.content.len()
        );

        if let Err(e) = RegisterName::parse(&params.register) {
            return error_result(&e);
        }

        match self
            .session
            .set_register(&params.register, &params.content)
            .await
        {
            Ok(message) => text_result(message),
            Err(e) => error_result(&e),
        }
    }

    /// Make a charwise visual selection
    #[tool(description = "Make a visual selection from a start position to an end position.")]
    #[instrument(skip_all)]
    async fn vim_visual(
        &self,
        Parameters(params): Parameters<VisualParams>,
    ) -> Result<CallToolResult, McpError> {
        info!(
            "vim_visual: {}:{} to {}:{}",
            params.start_line, params.start_column, params.end_line, params.end_column
        );

        match self
            .session
            .visual_select(
                params.start_line,
                params.start_column,
                params.end_line,
                params.end_column,
            )
            .await
        {
            Ok(message) => text_result(message),
            Err(e) => error_result(&e),
        }
    }

    /// Open a file and show its contents
    #[tool(description = "Open a file in the current window and return its contents with line numbers.")]
    #[instrument(skip_all)]
    async fn vim_open(
        &self,
        Parameters(params): Parameters<OpenParams>,
    ) -> Result<CallToolResult, McpError> {
        info!("vim_open: {}", params.path);

        match self.session.open_file(&params.path).await {
            Ok(contents) => text_result(contents.to_string()),
            Err(e) => error_result(&e),
        }
    }

    /// Print the working directory
    #[tool(description = "Get Neovim's current working directory.")]
    #[instrument(skip_all)]
    async fn vim_pwd(
        &self,
        Parameters(_params): Parameters<PwdParams>,
    ) -> Result<CallToolResult, McpError> {
        match self.session.get_cwd().await {
            Ok(cwd) => {
                debug!("cwd: {}", cwd);
                text_result(cwd)
            }
            Err(e) => error_result(&e),
        }
    }

    /// Find files by name
    #[tool(
        description = "Find files whose name contains the given text under the working directory. Requires ALLOW_SHELL_COMMANDS=true."
    )]
    #[instrument(skip_all)]
    async fn vim_find_file(
        &self,
        Parameters(params): Parameters<FindFileParams>,
    ) -> Result<CallToolResult, McpError> {
        info!("vim_find_file: {}", params.filename);

        if !self.session.allow_shell() {
            return self.shell_disabled();
        }

        match self.session.find_files(&params.filename).await {
            Ok(CommandOutcome::NoOutput) => {
                text_result(format!("No files matching '{}'", params.filename))
            }
            Ok(outcome) => text_result(outcome.to_string()),
            Err(e) => error_result(&e),
        }
    }

    /// Show the directory tree
    #[tool(
        description = "Show the directory tree of the working directory (three levels). Requires ALLOW_SHELL_COMMANDS=true."
    )]
    #[instrument(skip_all)]
    async fn vim_file_tree(
        &self,
        Parameters(_params): Parameters<FileTreeParams>,
    ) -> Result<CallToolResult, McpError> {
        if !self.session.allow_shell() {
            return self.shell_disabled();
        }

        match self.session.file_tree().await {
            Ok(outcome) => text_result(outcome.to_string()),
            Err(e) => error_result(&e),
        }
    }

    /// Insert several blocks, re-indent, and show the result
    #[tool(
        description = "Insert several blocks of text in one call. Each startLine refers to the buffer before any insert. The buffer is re-indented afterwards and returned with line numbers."
    )]
    #[instrument(skip_all)]
    async fn vim_insert_multiple(
        &self,
        Parameters(params): Parameters<InsertMultipleParams>,
    ) -> Result<CallToolResult, McpError> {
        info!("vim_insert_multiple: {} block(s)", params.inserts.len());

        let blocks: Vec<InsertBlock> = params.inserts.into_iter().map(Into::into).collect();
        if let Err(e) = self.session.insert_multiple(&blocks).await {
            return error_result(&e);
        }
        if let Err(e) = self.session.format_buffer().await {
            return error_result(&e);
        }

        match self.session.get_buffer_contents().await {
            Ok(contents) => text_result(contents.to_string()),
            Err(e) => error_result(&e),
        }
    }

    /// List open buffers
    #[tool(
        description = "List all buffers with their name, listed/loaded/modified flags, syntax and the windows showing them."
    )]
    #[instrument(skip_all)]
    async fn vim_buffers(
        &self,
        Parameters(_params): Parameters<BuffersParams>,
    ) -> Result<CallToolResult, McpError> {
        match self.session.get_open_buffers().await {
            Ok(buffers) => {
                info!("Listed {} buffer(s)", buffers.len());
                json_result(&buffers)
            }
            Err(e) => error_result(&e),
        }
    }

    /// List windows
    #[tool(description = "List all windows with their buffer, size and position.")]
    #[instrument(skip_all)]
    async fn vim_windows(
        &self,
        Parameters(_params): Parameters<WindowsParams>,
    ) -> Result<CallToolResult, McpError> {
        match self.session.get_windows().await {
            Ok(windows) => {
                info!("Listed {} window(s)", windows.len());
                json_result(&windows)
            }
            Err(e) => error_result(&e),
        }
    }
}

impl NvimMcpServer {
    /// Resources offered by this server
    pub fn resources() -> Vec<Resource> {
        let mut session = RawResource::new(SESSION_URI, "Current Buffer");
        session.description = Some("Contents of the current buffer with line numbers".into());
        session.mime_type = Some("text/plain".into());

        let mut buffers = RawResource::new(BUFFERS_URI, "Open Buffers");
        buffers.description = Some("All open buffers with their properties".into());
        buffers.mime_type = Some("application/json".into());

        vec![session.no_annotation(), buffers.no_annotation()]
    }

    /// Read one resource by URI
    #[instrument(skip_all, fields(uri = %uri))]
    pub async fn read_uri(&self, uri: &str) -> Result<ReadResourceResult, McpError> {
        debug!("Reading resource {}", uri);

        let text = match uri {
            SESSION_URI => self
                .session
                .get_buffer_contents()
                .await
                .map(|contents| contents.to_string()),
            BUFFERS_URI => self
                .session
                .get_open_buffers()
                .await
                .and_then(|buffers| pretty_json(&buffers)),
            _ => {
                warn!("Unknown resource requested: {}", uri);
                return Err(McpError::resource_not_found(
                    format!("Resource not found: {uri}"),
                    None,
                ));
            }
        }
        .map_err(|e| {
            error!("Failed to read resource {}: {}", uri, e);
            McpError::new(ErrorCode(-32603), format!("Error: {e}"), None)
        })?;

        Ok(ReadResourceResult {
            contents: vec![ResourceContents::text(text, uri)],
        })
    }
}

// Implement the ServerHandler trait to define server capabilities
#[tool_handler]
impl rmcp::ServerHandler for NvimMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Neovim MCP Server - Inspect and edit a running Neovim instance. \
                 Use vim_buffer and vim_status to read state, vim_edit and vim_command to change it, \
                 and the nvim://session and nvim://buffers resources for snapshots."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            ..Default::default()
        }
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        Ok(ListResourcesResult::with_all_items(Self::resources()))
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        self.read_uri(&request.uri).await
    }
}
