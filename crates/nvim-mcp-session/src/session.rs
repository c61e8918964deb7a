//! The adapter handle and buffer-level operations.

use std::sync::Arc;

use rmpv::Value;
use tracing::{debug, error, info, instrument, warn};

use nvim_mcp_core::{BufferContents, Result};
use nvim_mcp_rpc::{Connector, Nvim, CURRENT};

/// Adapter between tool requests and one running Neovim.
///
/// Holds no connection; each operation dials the editor through the
/// connector, does its work and drops the connection.
#[derive(Clone)]
pub struct NvimSession {
    /// Dials the editor
    connector: Arc<dyn Connector>,

    /// Whether `!cmd` may run shell commands inside the editor
    allow_shell: bool,
}

impl std::fmt::Debug for NvimSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NvimSession")
            .field("address", &self.connector.address())
            .field("allow_shell", &self.allow_shell)
            .finish()
    }
}

/// Log a failed operation at the adapter boundary and pass it through.
pub(crate) fn logged<T>(operation: &str, result: Result<T>) -> Result<T> {
    if let Err(e) = &result {
        if e.is_validation() {
            warn!("{} rejected: {}", operation, e);
        } else {
            error!("{} failed: {}", operation, e);
        }
    }
    result
}

impl NvimSession {
    /// Create a session with shell commands disabled.
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            allow_shell: false,
        }
    }

    /// Enable or disable `!cmd` shell execution.
    pub fn with_shell_commands(mut self, allow: bool) -> Self {
        self.allow_shell = allow;
        self
    }

    /// Whether shell commands are enabled.
    pub fn allow_shell(&self) -> bool {
        self.allow_shell
    }

    /// Address of the editor this session talks to.
    pub fn address(&self) -> &str {
        self.connector.address()
    }

    pub(crate) async fn connect(&self) -> Result<Nvim> {
        debug!("Opening connection to {}", self.connector.address());
        let client = self.connector.connect().await?;
        Ok(Nvim::new(client))
    }

    /// Read the whole current buffer as numbered lines.
    #[instrument(skip_all)]
    pub async fn get_buffer_contents(&self) -> Result<BufferContents> {
        let result: Result<BufferContents> = async {
            let mut nvim = self.connect().await?;
            read_buffer(&mut nvim).await
        }
        .await;
        logged("get_buffer_contents", result)
    }

    /// Open `path` in the current window and return its contents.
    #[instrument(skip_all, fields(path = %path))]
    pub async fn open_file(&self, path: &str) -> Result<BufferContents> {
        info!("Opening file: {}", path);
        let result: Result<BufferContents> = async {
            let mut nvim = self.connect().await?;
            let escaped = nvim
                .call_function_string("fnameescape", vec![Value::from(path)])
                .await?;
            nvim.command(&format!("edit {escaped}")).await?;
            read_buffer(&mut nvim).await
        }
        .await;
        logged("open_file", result)
    }

    /// The editor's working directory.
    #[instrument(skip_all)]
    pub async fn get_cwd(&self) -> Result<String> {
        let result: Result<String> = async {
            let mut nvim = self.connect().await?;
            nvim.call_function_string("getcwd", vec![]).await
        }
        .await;
        logged("get_cwd", result)
    }

    /// Re-indent the whole current buffer (`gg=G`).
    #[instrument(skip_all)]
    pub async fn format_buffer(&self) -> Result<()> {
        let result: Result<()> = async {
            let mut nvim = self.connect().await?;
            nvim.command("normal! gg=G").await
        }
        .await;
        logged("format_buffer", result)
    }
}

pub(crate) async fn read_buffer(nvim: &mut Nvim) -> Result<BufferContents> {
    let lines = nvim.buf_get_lines(CURRENT, 0, -1).await?;
    debug!("Read {} line(s) from current buffer", lines.len());
    Ok(BufferContents::from_lines(lines))
}
