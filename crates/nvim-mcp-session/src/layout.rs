//! Window and buffer listings, and window commands.

use tracing::{debug, info, instrument};

use nvim_mcp_core::{BufferInfo, Result, WindowCommand, WindowInfo};
use nvim_mcp_rpc::Nvim;

use crate::session::{logged, NvimSession};

async fn list_windows(nvim: &mut Nvim) -> Result<Vec<WindowInfo>> {
    let ids = nvim.list_wins().await?;
    let mut windows = Vec::with_capacity(ids.len());
    for id in ids {
        let buffer_id = nvim.win_get_buf(id).await?;
        let width = nvim.win_get_width(id).await?;
        let height = nvim.win_get_height(id).await?;
        let [row, col] = nvim.win_get_position(id).await?;
        windows.push(WindowInfo {
            id,
            buffer_id,
            width,
            height,
            row,
            col,
        });
    }
    Ok(windows)
}

impl NvimSession {
    /// Geometry of every window.
    #[instrument(skip_all)]
    pub async fn get_windows(&self) -> Result<Vec<WindowInfo>> {
        let result: Result<Vec<WindowInfo>> = async {
            let mut nvim = self.connect().await?;
            list_windows(&mut nvim).await
        }
        .await;
        if let Ok(windows) = &result {
            debug!("Found {} window(s)", windows.len());
        }
        logged("get_windows", result)
    }

    /// Every buffer with its flags and the windows displaying it.
    #[instrument(skip_all)]
    pub async fn get_open_buffers(&self) -> Result<Vec<BufferInfo>> {
        let result: Result<Vec<BufferInfo>> = async {
            let mut nvim = self.connect().await?;
            let windows = list_windows(&mut nvim).await?;

            let mut buffers = Vec::new();
            for id in nvim.list_bufs().await? {
                buffers.push(BufferInfo {
                    id,
                    name: nvim.buf_get_name(id).await?,
                    is_listed: nvim.buf_get_bool_option(id, "buflisted").await?,
                    is_loaded: nvim.buf_is_loaded(id).await?,
                    modified: nvim.buf_get_bool_option(id, "modified").await?,
                    syntax: nvim.buf_get_string_option(id, "syntax").await?,
                    window_ids: BufferInfo::windows_showing(id, &windows),
                });
            }
            Ok(buffers)
        }
        .await;
        logged("get_open_buffers", result)
    }

    /// Run an allow-listed window command.
    #[instrument(skip_all)]
    pub async fn manipulate_window(&self, command: &str) -> Result<String> {
        let result: Result<String> = async {
            let command = WindowCommand::parse(command)?;
            info!("Window command: {}", command);

            let mut nvim = self.connect().await?;
            nvim.command(command.as_str()).await?;
            Ok(format!("Window command '{command}' executed"))
        }
        .await;
        logged("manipulate_window", result)
    }
}
