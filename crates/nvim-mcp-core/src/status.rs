//! Editor status snapshot.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// `[line, column]` pair as reported by the editor (line 1-based, column 0-based).
pub type MarkPosition = [i64; 2];

/// Everything `vim_status` reports about the session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorStatus {
    /// Cursor of the current window
    pub cursor_position: MarkPosition,
    /// Mode short name (`n`, `i`, `v`, ...)
    pub mode: String,
    /// Name of the current buffer
    pub file_name: String,
    /// Selected text while in a visual mode, empty otherwise
    pub visual_selection: String,
    /// `winlayout()` rendered as JSON
    pub window_layout: String,
    /// Current tab page number (1-based)
    pub current_tab: i64,
    /// Marks that are set, keyed by name
    pub marks: BTreeMap<String, MarkPosition>,
    /// Registers with content, keyed by name
    pub registers: BTreeMap<String, String>,
    /// Editor working directory
    pub cwd: String,
}

impl EditorStatus {
    /// Whether `mode` denotes charwise, linewise or blockwise visual mode.
    pub fn is_visual_mode(mode: &str) -> bool {
        mode.starts_with('v') || mode.starts_with('V') || mode.starts_with('\u{16}')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visual_mode_detection() {
        assert!(EditorStatus::is_visual_mode("v"));
        assert!(EditorStatus::is_visual_mode("V"));
        assert!(EditorStatus::is_visual_mode("\u{16}"));
        assert!(!EditorStatus::is_visual_mode("n"));
        assert!(!EditorStatus::is_visual_mode("i"));
        assert!(!EditorStatus::is_visual_mode(""));
    }

    #[test]
    fn test_status_serialization_keys() {
        let mut status = EditorStatus {
            cursor_position: [3, 4],
            mode: "n".to_string(),
            current_tab: 1,
            ..Default::default()
        };
        status.marks.insert("a".to_string(), [1, 0]);

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["cursorPosition"], serde_json::json!([3, 4]));
        assert_eq!(json["marks"]["a"], serde_json::json!([1, 0]));
        assert_eq!(json["visualSelection"], "");
        assert!(json["registers"].as_object().unwrap().is_empty());
    }
}
