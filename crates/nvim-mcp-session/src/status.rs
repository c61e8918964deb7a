//! Status snapshot.

use std::collections::BTreeMap;

use rmpv::Value;
use tracing::{debug, instrument};

use nvim_mcp_core::{EditorStatus, MarkName, MarkPosition, RegisterName, Result};
use nvim_mcp_rpc::value::to_json;
use nvim_mcp_rpc::{Nvim, CURRENT};

use crate::session::{logged, NvimSession};

async fn probe_marks(nvim: &mut Nvim) -> BTreeMap<String, MarkPosition> {
    let mut marks = BTreeMap::new();
    for mark in MarkName::all() {
        match nvim.buf_get_mark(CURRENT, mark.as_char()).await {
            Ok([0, 0]) => {}
            Ok(position) => {
                marks.insert(mark.to_string(), position);
            }
            Err(e) => debug!("Skipping mark '{}': {}", mark, e),
        }
    }
    marks
}

async fn probe_registers(nvim: &mut Nvim) -> BTreeMap<String, String> {
    let mut registers = BTreeMap::new();
    for name in RegisterName::probed() {
        let text = nvim
            .call_function_string("getreg", vec![Value::from(name.to_string())])
            .await;
        match text {
            Ok(text) if !text.is_empty() => {
                registers.insert(name.to_string(), text);
            }
            Ok(_) => {}
            Err(e) => debug!("Skipping register '{}': {}", name, e),
        }
    }
    registers
}

async fn visual_selection(nvim: &mut Nvim) -> Result<String> {
    let [anchor_line, _] = nvim.getpos("v").await?;
    let [cursor_line, _] = nvim.getpos(".").await?;
    let (first, last) = if anchor_line <= cursor_line {
        (anchor_line, cursor_line)
    } else {
        (cursor_line, anchor_line)
    };
    let lines = nvim.buf_get_lines(CURRENT, first - 1, last).await?;
    Ok(lines.join("\n"))
}

impl NvimSession {
    /// Snapshot of cursor, mode, layout, marks and registers.
    ///
    /// Unset marks and empty registers are left out of the maps.
    #[instrument(skip_all)]
    pub async fn get_status(&self) -> Result<EditorStatus> {
        let result: Result<EditorStatus> = async {
            let mut nvim = self.connect().await?;

            let cursor_position = nvim.win_get_cursor(CURRENT).await?;
            let mode = nvim.get_mode().await?;
            let file_name = nvim.buf_get_name(CURRENT).await?;
            let layout = nvim.call_function("winlayout", vec![]).await?;
            let window_layout = serde_json::to_string(&to_json(&layout))?;
            let current_tab = nvim.current_tab_number().await?;
            let cwd = nvim.call_function_string("getcwd", vec![]).await?;

            let marks = probe_marks(&mut nvim).await;
            let registers = probe_registers(&mut nvim).await;

            let visual_selection = if EditorStatus::is_visual_mode(&mode) {
                visual_selection(&mut nvim).await?
            } else {
                String::new()
            };

            Ok(EditorStatus {
                cursor_position,
                mode,
                file_name,
                visual_selection,
                window_layout,
                current_tab,
                marks,
                registers,
                cwd,
            })
        }
        .await;
        logged("get_status", result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nvim_mcp_rpc::testing::FakeEditor;
    use std::sync::Arc;

    fn session(editor: &FakeEditor) -> NvimSession {
        NvimSession::new(Arc::new(editor.clone()))
    }

    #[tokio::test]
    async fn test_status_without_marks_has_empty_table() {
        let editor = FakeEditor::with_lines(&["one", "two"]);
        let status = session(&editor).get_status().await.unwrap();

        assert!(status.marks.is_empty());
        assert!(status.registers.is_empty());
        assert_eq!(status.mode, "n");
        assert_eq!(status.cursor_position, [1, 0]);
        assert_eq!(status.current_tab, 1);
        assert_eq!(status.cwd, "/home/user/project");
        assert_eq!(status.window_layout, r#"["leaf",1000]"#);
        assert!(status.visual_selection.is_empty());
    }

    #[tokio::test]
    async fn test_status_reports_set_marks_and_registers() {
        let editor = FakeEditor::with_lines(&["one", "two"]);
        editor.set_mark('a', 2, 1);
        editor.set_register('"', "yanked");
        editor.set_register('0', "yanked");

        let status = session(&editor).get_status().await.unwrap();

        assert_eq!(status.marks.len(), 1);
        assert_eq!(status.marks.get("a"), Some(&[2, 1]));
        assert_eq!(status.registers.get("\"").map(String::as_str), Some("yanked"));
        assert_eq!(status.registers.get("0").map(String::as_str), Some("yanked"));
        assert!(!status.registers.contains_key("b"));
    }

    #[tokio::test]
    async fn test_failed_register_probe_is_unset() {
        let editor = FakeEditor::new();
        editor.set_register('a', "text");
        editor.fail_method("nvim_buf_get_mark", "E20: Mark not set");

        let status = session(&editor).get_status().await.unwrap();
        assert!(status.marks.is_empty());
        assert_eq!(status.registers.len(), 1);
    }

    #[tokio::test]
    async fn test_visual_selection_lines() {
        let editor = FakeEditor::with_lines(&["one", "two", "three", "four"]);
        editor.set_mode("V");
        editor.set_visual_anchor(3, 0);
        editor.set_cursor(2, 1);

        let status = session(&editor).get_status().await.unwrap();
        assert_eq!(status.visual_selection, "two\nthree");
    }

    #[tokio::test]
    async fn test_status_fails_when_core_call_fails() {
        let editor = FakeEditor::new();
        editor.fail_method("nvim_get_mode", "boom");
        assert!(session(&editor).get_status().await.is_err());
    }
}
