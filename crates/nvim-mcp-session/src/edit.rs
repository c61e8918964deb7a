//! Line edits.
//!
//! Edits take 1-indexed line numbers and are translated into a single
//! `nvim_buf_set_lines` call over a 0-indexed, end-exclusive range.

use tracing::{debug, info, instrument};

use nvim_mcp_core::{EditMode, Error, Result};
use nvim_mcp_rpc::{Nvim, CURRENT};

use crate::session::{logged, NvimSession};

/// A resolved `nvim_buf_set_lines` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditPlan {
    /// First line replaced (0-indexed)
    pub start: i64,
    /// One past the last line replaced (0-indexed)
    pub end: i64,
    /// Replacement lines
    pub lines: Vec<String>,
}

impl EditPlan {
    /// Resolve an edit against a buffer of `line_count` lines.
    ///
    /// `buffer_empty` is true when the buffer holds a single empty line;
    /// inserting into such a buffer replaces that line.
    pub fn resolve(
        mode: EditMode,
        start_line: u64,
        text: &str,
        line_count: i64,
        buffer_empty: bool,
    ) -> Result<Self> {
        if start_line == 0 {
            return Err(Error::InvalidLine(start_line));
        }
        let lines = split_lines(text);
        // Lines past the end clamp to an append, however large
        let index = i64::try_from(start_line - 1)
            .unwrap_or(i64::MAX)
            .min(line_count);

        let (start, end) = match mode {
            EditMode::Insert if buffer_empty => (0, line_count),
            EditMode::Insert => (index, index),
            EditMode::Replace => (index, line_count),
            EditMode::ReplaceAll => (0, line_count),
        };

        Ok(Self { start, end, lines })
    }

    /// Confirmation text for an applied edit.
    pub fn confirmation(&self, mode: EditMode, start_line: u64) -> String {
        let count = self.lines.len();
        match mode {
            EditMode::Insert => format!("Inserted {count} line(s) at line {start_line}"),
            EditMode::Replace => format!("Replaced lines from {start_line} with {count} line(s)"),
            EditMode::ReplaceAll => format!("Replaced buffer contents with {count} line(s)"),
        }
    }
}

/// Split edit text into buffer lines.
pub fn split_lines(text: &str) -> Vec<String> {
    text.split('\n').map(str::to_string).collect()
}

/// One block of a batched insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertBlock {
    /// Line to insert before, relative to the buffer before the batch
    pub start_line: u64,
    /// Text to insert
    pub content: String,
}

async fn buffer_shape(nvim: &mut Nvim) -> Result<(i64, bool)> {
    let line_count = nvim.buf_line_count(CURRENT).await?;
    let empty = line_count == 1
        && nvim
            .buf_get_lines(CURRENT, 0, 1)
            .await?
            .first()
            .is_some_and(|line| line.is_empty());
    Ok((line_count, empty))
}

async fn apply(nvim: &mut Nvim, mode: EditMode, start_line: u64, text: &str) -> Result<EditPlan> {
    let (line_count, empty) = buffer_shape(nvim).await?;
    let plan = EditPlan::resolve(mode, start_line, text, line_count, empty)?;
    debug!(
        "Setting lines [{}, {}) to {} line(s)",
        plan.start,
        plan.end,
        plan.lines.len()
    );
    nvim.buf_set_lines(CURRENT, plan.start, plan.end, &plan.lines)
        .await?;
    Ok(plan)
}

impl NvimSession {
    /// Insert or replace lines in the current buffer.
    #[instrument(skip_all, fields(start_line = start_line, mode = %mode))]
    pub async fn edit_lines(&self, start_line: u64, mode: EditMode, text: &str) -> Result<String> {
        info!("Editing buffer: {} at line {}", mode, start_line);
        let result: Result<String> = async {
            if start_line == 0 {
                return Err(Error::InvalidLine(start_line));
            }
            let mut nvim = self.connect().await?;
            let plan = apply(&mut nvim, mode, start_line, text).await?;
            Ok(plan.confirmation(mode, start_line))
        }
        .await;
        logged("edit_lines", result)
    }

    /// Insert several blocks, each positioned against the original buffer.
    ///
    /// Every block is shifted down by the number of lines the earlier blocks
    /// inserted.
    #[instrument(skip_all, fields(blocks = blocks.len()))]
    pub async fn insert_multiple(&self, blocks: &[InsertBlock]) -> Result<String> {
        info!("Inserting {} block(s)", blocks.len());
        let result: Result<String> = async {
            if let Some(block) = blocks.iter().find(|b| b.start_line == 0) {
                return Err(Error::InvalidLine(block.start_line));
            }
            let mut nvim = self.connect().await?;
            let mut offset = 0u64;
            for block in blocks {
                let plan = apply(
                    &mut nvim,
                    EditMode::Insert,
                    block.start_line.saturating_add(offset),
                    &block.content,
                )
                .await?;
                offset = offset.saturating_add(plan.lines.len() as u64);
            }
            Ok(format!("Inserted {} block(s), {} line(s)", blocks.len(), offset))
        }
        .await;
        logged("insert_multiple", result)
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

    #[test]
    fn test_resolve_insert() {
        let plan = EditPlan::resolve(EditMode::Insert, 3, "a\nb", 5, false).unwrap();
        assert_eq!((plan.start, plan.end), (2, 2));
        assert_eq!(plan.lines, vec!["a", "b"]);
    }

    #[test]
    fn test_resolve_insert_past_end_appends() {
        let plan = EditPlan::resolve(EditMode::Insert, 99, "x", 5, false).unwrap();
        assert_eq!((plan.start, plan.end), (5, 5));
    }

    #[test]
    fn test_resolve_huge_start_line_clamps_to_end() {
        for start_line in [u64::MAX, 1 << 63, i64::MAX as u64] {
            let plan = EditPlan::resolve(EditMode::Insert, start_line, "x", 5, false).unwrap();
            assert_eq!((plan.start, plan.end), (5, 5), "{start_line}");
            let plan = EditPlan::resolve(EditMode::Replace, start_line, "x", 5, false).unwrap();
            assert_eq!((plan.start, plan.end), (5, 5), "{start_line}");
        }
    }

    #[test]
    fn test_resolve_insert_into_empty_buffer_replaces_placeholder() {
        let plan = EditPlan::resolve(EditMode::Insert, 1, "x", 1, true).unwrap();
        assert_eq!((plan.start, plan.end), (0, 1));
    }

    #[test]
    fn test_resolve_replace_and_replace_all() {
        let plan = EditPlan::resolve(EditMode::Replace, 5, "x\ny", 10, false).unwrap();
        assert_eq!((plan.start, plan.end), (4, 10));
        let plan = EditPlan::resolve(EditMode::ReplaceAll, 7, "x", 10, false).unwrap();
        assert_eq!((plan.start, plan.end), (0, 10));
    }

    #[test]
    fn test_resolve_rejects_line_zero() {
        assert!(matches!(
            EditPlan::resolve(EditMode::Insert, 0, "x", 1, false),
            Err(Error::InvalidLine(0))
        ));
    }

    #[test]
    fn test_confirmations() {
        let plan = EditPlan::resolve(EditMode::Insert, 2, "a\nb", 3, false).unwrap();
        assert_eq!(
            plan.confirmation(EditMode::Insert, 2),
            "Inserted 2 line(s) at line 2"
        );
        assert_eq!(
            plan.confirmation(EditMode::Replace, 2),
            "Replaced lines from 2 with 2 line(s)"
        );
        assert_eq!(
            plan.confirmation(EditMode::ReplaceAll, 2),
            "Replaced buffer contents with 2 line(s)"
        );
    }

    #[tokio::test]
    async fn test_replace_from_line_five() {
        let lines: Vec<String> = (1..=8).map(|n| format!("line {n}")).collect();
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        let editor = FakeEditor::with_lines(&refs);

        let message = session(&editor)
            .edit_lines(5, EditMode::Replace, "x\ny")
            .await
            .unwrap();

        assert_eq!(message, "Replaced lines from 5 with 2 line(s)");
        assert_eq!(
            editor.lines(),
            vec!["line 1", "line 2", "line 3", "line 4", "x", "y"]
        );
    }

    #[tokio::test]
    async fn test_insert_into_empty_buffer() {
        let editor = FakeEditor::new();
        session(&editor)
            .edit_lines(1, EditMode::Insert, "hello")
            .await
            .unwrap();
        assert_eq!(editor.lines(), vec!["hello"]);
    }

    #[tokio::test]
    async fn test_line_zero_never_connects() {
        let editor = FakeEditor::new();
        let err = session(&editor)
            .edit_lines(0, EditMode::Insert, "x")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidLine(0)));
        assert_eq!(editor.connections(), 0);
    }

    #[tokio::test]
    async fn test_huge_start_line_appends() {
        let editor = FakeEditor::with_lines(&["a", "b", "c"]);
        let session = session(&editor);
        session
            .edit_lines(u64::MAX, EditMode::Insert, "x")
            .await
            .unwrap();
        session
            .edit_lines(1 << 63, EditMode::Insert, "y")
            .await
            .unwrap();
        assert_eq!(editor.lines(), vec!["a", "b", "c", "x", "y"]);
    }

    #[tokio::test]
    async fn test_insert_multiple_huge_start_line_appends() {
        let editor = FakeEditor::with_lines(&["a", "b", "c"]);
        let blocks = vec![
            InsertBlock {
                start_line: 1,
                content: "x".into(),
            },
            InsertBlock {
                start_line: u64::MAX,
                content: "y".into(),
            },
        ];
        let message = session(&editor).insert_multiple(&blocks).await.unwrap();
        assert_eq!(editor.lines(), vec!["x", "a", "b", "c", "y"]);
        assert_eq!(message, "Inserted 2 block(s), 2 line(s)");
    }

    #[tokio::test]
    async fn test_insert_multiple_on_empty_buffer() {
        let editor = FakeEditor::new();
        let blocks = vec![
            InsertBlock {
                start_line: 1,
                content: "a".into(),
            },
            InsertBlock {
                start_line: 1,
                content: "b".into(),
            },
        ];
        let message = session(&editor).insert_multiple(&blocks).await.unwrap();
        assert_eq!(editor.lines(), vec!["a", "b"]);
        assert_eq!(message, "Inserted 2 block(s), 2 line(s)");
    }

    #[tokio::test]
    async fn test_insert_multiple_offsets_against_original() {
        let editor = FakeEditor::with_lines(&["one", "two", "three"]);
        let blocks = vec![
            InsertBlock {
                start_line: 1,
                content: "A1\nA2".into(),
            },
            InsertBlock {
                start_line: 3,
                content: "B".into(),
            },
        ];
        session(&editor).insert_multiple(&blocks).await.unwrap();
        assert_eq!(editor.lines(), vec!["A1", "A2", "one", "two", "B", "three"]);
    }
}
