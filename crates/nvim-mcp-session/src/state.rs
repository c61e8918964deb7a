//! Marks, registers and visual selections.

use tracing::{info, instrument};

use nvim_mcp_core::{MarkName, RegisterName, Result};
use nvim_mcp_rpc::CURRENT;

use crate::command::vim_quote;
use crate::session::{logged, NvimSession};

impl NvimSession {
    /// Place mark `mark` at `(line, column)`.
    ///
    /// The cursor is moved to the position first, so the mark lands there
    /// rather than wherever the cursor happened to be.
    #[instrument(skip_all, fields(mark = %mark))]
    pub async fn set_mark(&self, mark: &str, line: i64, column: i64) -> Result<String> {
        let result: Result<String> = async {
            let mark = MarkName::parse(mark)?;
            info!("Setting mark '{}' at {}:{}", mark, line, column);

            let mut nvim = self.connect().await?;
            nvim.win_set_cursor(CURRENT, line, column).await?;
            nvim.command(&format!("normal! m{mark}")).await?;
            Ok(format!("Mark '{mark}' set at line {line}, column {column}"))
        }
        .await;
        logged("set_mark", result)
    }

    /// Replace the contents of `register`.
    #[instrument(skip_all, fields(register = %register))]
    pub async fn set_register(&self, register: &str, content: &str) -> Result<String> {
        let result: Result<String> = async {
            let register = RegisterName::parse(register)?;
            info!("Setting register '{}' ({} bytes)", register, content.len());

            let mut nvim = self.connect().await?;
            let expr = format!(
                "setreg({}, {})",
                vim_quote(&register.to_string()),
                vim_quote(content)
            );
            nvim.eval(&expr).await?;
            Ok(format!("Register '{register}' set"))
        }
        .await;
        logged("set_register", result)
    }

    /// Select from `(start_line, start_column)` to `(end_line, end_column)` charwise.
    #[instrument(skip_all)]
    pub async fn visual_select(
        &self,
        start_line: i64,
        start_column: i64,
        end_line: i64,
        end_column: i64,
    ) -> Result<String> {
        info!(
            "Selecting {}:{} to {}:{}",
            start_line, start_column, end_line, end_column
        );
        let result: Result<String> = async {
            let mut nvim = self.connect().await?;
            nvim.feedkeys("\u{1b}", "nx").await?;
            nvim.win_set_cursor(CURRENT, start_line, start_column).await?;
            nvim.feedkeys("v", "nx").await?;
            nvim.win_set_cursor(CURRENT, end_line, end_column).await?;
            Ok("Visual selection made".to_string())
        }
        .await;
        logged("visual_select", result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nvim_mcp_core::Error;
    use nvim_mcp_rpc::testing::FakeEditor;
    use std::sync::Arc;

    fn session(editor: &FakeEditor) -> NvimSession {
        NvimSession::new(Arc::new(editor.clone()))
    }

    #[tokio::test]
    async fn test_mark_lands_at_requested_position() {
        let editor = FakeEditor::with_lines(&["a", "b", "c", "d"]);
        editor.set_cursor(1, 0);

        let message = session(&editor).set_mark("q", 3, 1).await.unwrap();

        assert_eq!(message, "Mark 'q' set at line 3, column 1");
        assert_eq!(editor.mark('q'), Some((3, 1)));
    }

    #[tokio::test]
    async fn test_invalid_mark_never_connects() {
        let editor = FakeEditor::new();
        for bad in ["A", "1", "ab", ""] {
            let err = session(&editor).set_mark(bad, 1, 0).await.unwrap_err();
            assert!(matches!(err, Error::InvalidMark(_)));
        }
        assert_eq!(editor.connections(), 0);
    }

    #[tokio::test]
    async fn test_register_content_with_quotes() {
        let editor = FakeEditor::new();
        let message = session(&editor)
            .set_register("a", "it's \"quoted\"")
            .await
            .unwrap();
        assert_eq!(message, "Register 'a' set");
        assert_eq!(editor.register('a').as_deref(), Some("it's \"quoted\""));
    }

    #[tokio::test]
    async fn test_unnamed_register() {
        let editor = FakeEditor::new();
        session(&editor).set_register("\"", "yank").await.unwrap();
        assert_eq!(editor.register('"').as_deref(), Some("yank"));
    }

    #[tokio::test]
    async fn test_invalid_register_never_connects() {
        let editor = FakeEditor::new();
        let err = session(&editor).set_register("A", "x").await.unwrap_err();
        assert!(matches!(err, Error::InvalidRegister(_)));
        assert_eq!(editor.call_count(), 0);
    }

    #[tokio::test]
    async fn test_visual_select_walks_cursor() {
        let editor = FakeEditor::with_lines(&["hello", "world"]);
        let message = session(&editor).visual_select(1, 1, 2, 3).await.unwrap();

        assert_eq!(message, "Visual selection made");
        assert_eq!(editor.mode(), "v");
        assert_eq!(editor.cursor(), (2, 3));
    }
}
