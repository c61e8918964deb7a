//! Property-based tests for line edits.
//!
//! Runs edits against the in-memory editor and checks the resulting buffer.

use proptest::prelude::*;
use std::sync::Arc;

use nvim_mcp_core::EditMode;
use nvim_mcp_rpc::testing::FakeEditor;
use nvim_mcp_session::NvimSession;

/// Generate a single buffer line without newlines.
fn line() -> impl Strategy<Value = String> {
    "[a-z0-9 ]{0,12}"
}

/// Generate a non-empty buffer.
fn buffer() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(line(), 1..20)
}

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

fn editor_with(lines: &[String]) -> FakeEditor {
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    FakeEditor::with_lines(&refs)
}

proptest! {
    /// Inserting before line L shifts every later line down by the inserted count.
    #[test]
    fn insert_shifts_later_lines(
        original in buffer(),
        inserted in prop::collection::vec(line(), 1..6),
        at in 1usize..25,
    ) {
        // A lone empty line is treated as an empty buffer.
        prop_assume!(!(original.len() == 1 && original[0].is_empty()));

        let editor = editor_with(&original);
        let session = NvimSession::new(Arc::new(editor.clone()));
        block_on(session.edit_lines(at as u64, EditMode::Insert, &inserted.join("\n"))).unwrap();

        let result = editor.lines();
        let index = (at - 1).min(original.len());
        prop_assert_eq!(result.len(), original.len() + inserted.len());
        prop_assert_eq!(&result[..index], &original[..index]);
        prop_assert_eq!(&result[index..index + inserted.len()], &inserted[..]);
        prop_assert_eq!(&result[index + inserted.len()..], &original[index..]);
    }

    /// Any start line past the end appends, up to the largest representable line.
    #[test]
    fn insert_past_end_appends(
        original in buffer(),
        inserted in prop::collection::vec(line(), 1..6),
        at in any::<u64>(),
    ) {
        prop_assume!(!(original.len() == 1 && original[0].is_empty()));
        let at = at.max(original.len() as u64 + 1);

        let editor = editor_with(&original);
        let session = NvimSession::new(Arc::new(editor.clone()));
        block_on(session.edit_lines(at, EditMode::Insert, &inserted.join("\n"))).unwrap();

        let result = editor.lines();
        prop_assert_eq!(&result[..original.len()], &original[..]);
        prop_assert_eq!(&result[original.len()..], &inserted[..]);
    }

    /// replaceAll leaves exactly the replacement lines, whatever the buffer size.
    #[test]
    fn replace_all_yields_replacement(
        original in buffer(),
        replacement in prop::collection::vec(line(), 1..30),
        at in 1u64..50,
    ) {
        let editor = editor_with(&original);
        let session = NvimSession::new(Arc::new(editor.clone()));
        block_on(session.edit_lines(at, EditMode::ReplaceAll, &replacement.join("\n"))).unwrap();

        let contents = block_on(session.get_buffer_contents()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        prop_assert_eq!(lines, replacement.iter().map(String::as_str).collect::<Vec<_>>());
    }

    /// replace keeps everything above the start line and drops everything below.
    #[test]
    fn replace_keeps_prefix(
        original in buffer(),
        replacement in prop::collection::vec(line(), 1..6),
        at in 1usize..20,
    ) {
        prop_assume!(at <= original.len());

        let editor = editor_with(&original);
        let session = NvimSession::new(Arc::new(editor.clone()));
        block_on(session.edit_lines(at as u64, EditMode::Replace, &replacement.join("\n"))).unwrap();

        let result = editor.lines();
        prop_assert_eq!(&result[..at - 1], &original[..at - 1]);
        prop_assert_eq!(&result[at - 1..], &replacement[..]);
    }
}
