//! Window and buffer listings.

use serde::{Deserialize, Serialize};

/// A window as reported by the editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowInfo {
    /// Window handle
    pub id: i64,
    /// Buffer shown in the window
    pub buffer_id: i64,
    /// Width in columns
    pub width: i64,
    /// Height in rows
    pub height: i64,
    /// Screen row of the top-left corner (0-based)
    pub row: i64,
    /// Screen column of the top-left corner (0-based)
    pub col: i64,
}

/// An open buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferInfo {
    /// Buffer number
    pub id: i64,
    /// Full path, or empty for unnamed buffers
    pub name: String,
    /// Shows up in `:ls`
    pub is_listed: bool,
    /// Loaded into memory
    pub is_loaded: bool,
    /// Has unsaved changes
    pub modified: bool,
    /// Value of the `syntax` option
    pub syntax: String,
    /// Windows currently displaying this buffer
    pub window_ids: Vec<i64>,
}

impl BufferInfo {
    /// Collect the ids of windows showing `buffer_id`.
    pub fn windows_showing(buffer_id: i64, windows: &[WindowInfo]) -> Vec<i64> {
        windows
            .iter()
            .filter(|w| w.buffer_id == buffer_id)
            .map(|w| w.id)
            .collect()
    }
}
