//! Validated names for marks, registers, window commands and edit modes.
//!
//! Everything here is checked locally so that malformed input is rejected
//! before the editor is contacted.

use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

lazy_static! {
    static ref MARK_PATTERN: Regex = Regex::new(r#"^[a-z]$"#).unwrap();
    static ref REGISTER_PATTERN: Regex = Regex::new(r#"^[a-z"]$"#).unwrap();
}

/// A lowercase (buffer-local) mark name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MarkName(char);

impl MarkName {
    /// Marks probed when building a status snapshot.
    pub fn all() -> impl Iterator<Item = MarkName> {
        ('a'..='z').map(MarkName)
    }

    /// Validate a mark name (`[a-z]`).
    pub fn parse(s: &str) -> Result<Self> {
        if !MARK_PATTERN.is_match(s) {
            return Err(Error::InvalidMark(s.to_string()));
        }
        s.chars()
            .next()
            .map(MarkName)
            .ok_or_else(|| Error::InvalidMark(s.to_string()))
    }

    /// The mark character.
    pub fn as_char(&self) -> char {
        self.0
    }
}

impl fmt::Display for MarkName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A register that can be written through `vim_register`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegisterName(char);

impl RegisterName {
    /// The unnamed register.
    pub const UNNAMED: char = '"';

    /// Validate a writable register name (`[a-z"]`).
    pub fn parse(s: &str) -> Result<Self> {
        if !REGISTER_PATTERN.is_match(s) {
            return Err(Error::InvalidRegister(s.to_string()));
        }
        s.chars()
            .next()
            .map(RegisterName)
            .ok_or_else(|| Error::InvalidRegister(s.to_string()))
    }

    /// Registers probed when building a status snapshot: a-z, unnamed, 0-9.
    pub fn probed() -> impl Iterator<Item = char> {
        ('a'..='z')
            .chain(std::iter::once(Self::UNNAMED))
            .chain('0'..='9')
    }

    /// The register character.
    pub fn as_char(&self) -> char {
        self.0
    }
}

impl fmt::Display for RegisterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A window command from the allow-list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowCommand(String);

impl WindowCommand {
    /// Allowed command prefixes.
    pub const ALLOWED: [&'static str; 8] = [
        "split", "vsplit", "only", "close", "wincmd h", "wincmd j", "wincmd k", "wincmd l",
    ];

    /// Validate against the allow-list.
    ///
    /// A command is accepted when it starts with an allowed prefix and
    /// anything after the prefix is a whitespace-separated argument that
    /// cannot chain another Ex command.
    pub fn parse(s: &str) -> Result<Self> {
        let command = s.trim();
        let chains = command.contains('|') || command.contains('\n') || command.contains('\r');

        let allowed = !chains
            && Self::ALLOWED.iter().any(|prefix| {
                command
                    .strip_prefix(prefix)
                    .is_some_and(|rest| rest.is_empty() || rest.starts_with(char::is_whitespace))
            });

        if allowed {
            Ok(Self(command.to_string()))
        } else {
            Err(Error::InvalidWindowCommand(s.to_string()))
        }
    }

    /// The command text to forward.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WindowCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How `vim_edit` applies its text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum EditMode {
    /// Insert before the start line
    #[serde(rename = "insert")]
    Insert,
    /// Replace from the start line to the end of the buffer
    #[serde(rename = "replace")]
    Replace,
    /// Replace the whole buffer
    #[serde(rename = "replaceAll")]
    ReplaceAll,
}

impl fmt::Display for EditMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EditMode::Insert => "insert",
            EditMode::Replace => "replace",
            EditMode::ReplaceAll => "replaceAll",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_parse() {
        assert_eq!(MarkName::parse("a").unwrap().as_char(), 'a');
        assert_eq!(MarkName::parse("z").unwrap().as_char(), 'z');
        assert!(matches!(MarkName::parse("A"), Err(Error::InvalidMark(_))));
        assert!(MarkName::parse("ab").is_err());
        assert!(MarkName::parse("").is_err());
        assert!(MarkName::parse("1").is_err());
        assert!(MarkName::parse("'").is_err());
    }

    #[test]
    fn test_all_marks() {
        let marks: Vec<char> = MarkName::all().map(|m| m.as_char()).collect();
        assert_eq!(marks.len(), 26);
        assert_eq!(marks.first(), Some(&'a'));
        assert_eq!(marks.last(), Some(&'z'));
    }

    #[test]
    fn test_register_parse() {
        assert_eq!(RegisterName::parse("q").unwrap().as_char(), 'q');
        assert_eq!(RegisterName::parse("\"").unwrap().as_char(), '"');
        assert!(matches!(
            RegisterName::parse("+"),
            Err(Error::InvalidRegister(_))
        ));
        assert!(RegisterName::parse("ab").is_err());
        assert!(RegisterName::parse("").is_err());
        assert!(RegisterName::parse("0").is_err());
        assert!(RegisterName::parse("Q").is_err());
    }

    #[test]
    fn test_probed_registers() {
        let probed: Vec<char> = RegisterName::probed().collect();
        assert_eq!(probed.len(), 37);
        assert!(probed.contains(&'"'));
        assert!(probed.contains(&'0'));
        assert!(probed.contains(&'9'));
    }

    #[test]
    fn test_window_command_allow_list() {
        for command in WindowCommand::ALLOWED {
            assert_eq!(WindowCommand::parse(command).unwrap().as_str(), command);
        }
        assert_eq!(
            WindowCommand::parse("split notes.md").unwrap().as_str(),
            "split notes.md"
        );
    }

    #[test]
    fn test_window_command_rejections() {
        assert!(matches!(
            WindowCommand::parse("foo"),
            Err(Error::InvalidWindowCommand(_))
        ));
        assert!(WindowCommand::parse("wincmd x").is_err());
        assert!(WindowCommand::parse("splitx").is_err());
        assert!(WindowCommand::parse("close | !rm -rf /").is_err());
        assert!(WindowCommand::parse("only\nqa!").is_err());
        assert!(WindowCommand::parse("").is_err());
    }

    #[test]
    fn test_edit_mode_serde() {
        let mode: EditMode = serde_json::from_str("\"replaceAll\"").unwrap();
        assert_eq!(mode, EditMode::ReplaceAll);
        assert_eq!(serde_json::to_string(&EditMode::Insert).unwrap(), "\"insert\"");
        assert!(serde_json::from_str::<EditMode>("\"append\"").is_err());
        assert_eq!(EditMode::Replace.to_string(), "replace");
    }
}
