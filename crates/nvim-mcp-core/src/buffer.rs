//! Buffer contents snapshot.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Lines of the active buffer keyed by 1-indexed line number.
///
/// Always built from a single line array, so keys run contiguously from 1.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BufferContents(BTreeMap<usize, String>);

impl BufferContents {
    /// Build from the editor's line array (index 0 becomes line 1).
    pub fn from_lines<I>(lines: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        Self(
            lines
                .into_iter()
                .enumerate()
                .map(|(idx, text)| (idx + 1, text))
                .collect(),
        )
    }

    /// Text of a 1-indexed line.
    pub fn line(&self, number: usize) -> Option<&str> {
        self.0.get(&number).map(String::as_str)
    }

    /// Number of lines.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no lines were read.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Line texts in order.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.0.values().map(String::as_str)
    }
}

/// Renders `"<n>: <text>"` rows joined by newlines.
impl fmt::Display for BufferContents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (number, text)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{number}: {text}")?;
        }
        Ok(())
    }
}
