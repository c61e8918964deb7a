//! Ex command execution and the shell opt-in.

use std::fmt;

use rmpv::Value;
use tracing::{debug, info, instrument, warn};

use nvim_mcp_core::{Error, Result};

use crate::session::{logged, NvimSession};

/// What happened when a command was sent to the editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The command produced output
    Output(String),
    /// The command ran and printed nothing
    NoOutput,
    /// The editor reported an error (from the response or `v:errmsg`)
    EditorError(String),
    /// A shell command was refused because the opt-in is off
    ShellDisabled,
    /// Output of a shell command
    ShellOutput(String),
}

impl CommandOutcome {
    /// Whether the editor reported an error.
    pub fn is_error(&self) -> bool {
        matches!(self, CommandOutcome::EditorError(_))
    }
}

impl fmt::Display for CommandOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandOutcome::Output(text) | CommandOutcome::ShellOutput(text) => f.write_str(text),
            CommandOutcome::NoOutput => f.write_str("Command executed (no output)"),
            CommandOutcome::EditorError(text) => write!(f, "Error executing command: {text}"),
            CommandOutcome::ShellDisabled => write!(f, "{}", Error::ShellDisabled),
        }
    }
}

/// Quote `s` as a Vim single-quoted string literal.
pub fn vim_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Quote `s` as a single POSIX shell word.
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "'\\''"))
}

/// The command with the leading run of `:` and whitespace removed.
///
/// Neovim skips that run before parsing the command name, so `"::!ls"` and
/// `": !ls"` both reach the shell.
pub fn command_body(command: &str) -> &str {
    command
        .trim_start_matches(|c: char| c == ':' || c.is_whitespace())
        .trim_end()
}

/// Skip a leading line range such as `%`, `.,$`, `'<,'>` or `3;+2`.
fn skip_range(command: &str) -> &str {
    let mut rest = command;
    loop {
        let trimmed = rest.trim_start_matches(|c: char| {
            c.is_ascii_digit() || c.is_whitespace() || ":.$%,;+-".contains(c)
        });
        match trimmed.strip_prefix('\'') {
            // `'x` names a mark; skip its letter too
            Some(mark) => {
                let mut chars = mark.chars();
                chars.next();
                rest = chars.as_str();
            }
            None => return trimmed,
        }
    }
}

/// Whether `command` runs a shell: `!cmd`, or a filter such as `%!sort`.
pub fn is_shell_command(command: &str) -> bool {
    skip_range(command_body(command)).starts_with('!')
}

fn output_outcome(text: &str, shell: bool) -> CommandOutcome {
    let text = text.trim();
    match (text.is_empty(), shell) {
        (true, _) => CommandOutcome::NoOutput,
        (false, true) => CommandOutcome::ShellOutput(text.to_string()),
        (false, false) => CommandOutcome::Output(text.to_string()),
    }
}

impl NvimSession {
    /// Execute an Ex command, or a `!` shell command when enabled.
    ///
    /// Leading `:` and whitespace are ignored. Editor errors are reported as
    /// [`CommandOutcome::EditorError`], not as `Err`; `Err` means the editor
    /// could not be reached or replied with garbage.
    #[instrument(skip_all)]
    pub async fn send_command(&self, command: &str) -> Result<CommandOutcome> {
        let command = command_body(command);

        if is_shell_command(command) {
            if !self.allow_shell() {
                warn!("Refusing shell command, shell commands are disabled");
                return Ok(CommandOutcome::ShellDisabled);
            }
            if let Some(shell) = command.strip_prefix('!') {
                return self.run_shell(shell.trim()).await;
            }
        }

        info!("Executing command: {}", command);
        let result: Result<CommandOutcome> = async {
            let mut nvim = self.connect().await?;
            nvim.set_vvar("errmsg", Value::from("")).await?;

            let output = match nvim.exec_capture(command).await {
                Ok(output) => output,
                Err(Error::Remote(message)) => {
                    debug!("Command failed in editor: {}", message);
                    return Ok(CommandOutcome::EditorError(message));
                }
                Err(e) => return Err(e),
            };

            let errmsg = nvim.get_vvar_string("errmsg").await?;
            if !errmsg.is_empty() {
                debug!("Command set v:errmsg: {}", errmsg);
                return Ok(CommandOutcome::EditorError(errmsg));
            }

            Ok(output_outcome(&output, false))
        }
        .await;
        logged("send_command", result)
    }

    /// Run a shell command through the editor's `system()`.
    #[instrument(skip_all)]
    pub async fn run_shell(&self, command: &str) -> Result<CommandOutcome> {
        if !self.allow_shell() {
            warn!("Refusing shell command, shell commands are disabled");
            return Ok(CommandOutcome::ShellDisabled);
        }

        info!("Executing shell command: {}", command);
        let result: Result<CommandOutcome> = async {
            let mut nvim = self.connect().await?;
            let output = nvim
                .eval_string(&format!("system({})", vim_quote(command)))
                .await?;
            Ok(output_outcome(&output, true))
        }
        .await;
        logged("run_shell", result)
    }

    /// List files under the editor's working directory whose name contains `filename`.
    #[instrument(skip_all)]
    pub async fn find_files(&self, filename: &str) -> Result<CommandOutcome> {
        let pattern = shell_quote(&format!("*{filename}*"));
        self.run_shell(&format!(
            "find . -type f -name {pattern} -not -path '*/.git/*'"
        ))
        .await
    }

    /// Directory tree of the editor's working directory, three levels deep.
    #[instrument(skip_all)]
    pub async fn file_tree(&self) -> Result<CommandOutcome> {
        self.run_shell("find . -maxdepth 3 -not -path '*/.git*' | sort")
            .await
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
    fn test_outcome_display() {
        assert_eq!(
            CommandOutcome::NoOutput.to_string(),
            "Command executed (no output)"
        );
        assert_eq!(
            CommandOutcome::EditorError("E492: Not an editor command: foo".into()).to_string(),
            "Error executing command: E492: Not an editor command: foo"
        );
        assert_eq!(
            CommandOutcome::ShellDisabled.to_string(),
            "Shell commands are disabled. Set ALLOW_SHELL_COMMANDS=true to enable them."
        );
        assert_eq!(CommandOutcome::Output("x".into()).to_string(), "x");
    }

    #[test]
    fn test_quoting() {
        assert_eq!(vim_quote("it's"), "'it''s'");
        assert_eq!(shell_quote("it's"), "'it'\\''s'");
    }

    #[tokio::test]
    async fn test_command_output_captured() {
        let editor = FakeEditor::new();
        editor.command_output("echo 'hi'", "hi");
        let outcome = session(&editor).send_command(":echo 'hi'").await.unwrap();
        assert_eq!(outcome, CommandOutcome::Output("hi".into()));
        assert_eq!(editor.executed(), vec!["echo 'hi'"]);
    }

    #[tokio::test]
    async fn test_command_without_output() {
        let editor = FakeEditor::new();
        let outcome = session(&editor).send_command("set number").await.unwrap();
        assert_eq!(outcome, CommandOutcome::NoOutput);
    }

    #[tokio::test]
    async fn test_error_response_becomes_editor_error() {
        let editor = FakeEditor::new();
        editor.fail_command("bogus", "Vim:E492: Not an editor command: bogus");
        let outcome = session(&editor).send_command("bogus").await.unwrap();
        assert!(outcome.is_error());
        assert_eq!(
            outcome.to_string(),
            "Error executing command: Vim:E492: Not an editor command: bogus"
        );
    }

    #[tokio::test]
    async fn test_errmsg_becomes_editor_error() {
        let editor = FakeEditor::new();
        editor.silent_error("silent! write", "E32: No file name");
        let outcome = session(&editor).send_command("silent! write").await.unwrap();
        assert_eq!(outcome, CommandOutcome::EditorError("E32: No file name".into()));
    }

    #[tokio::test]
    async fn test_shell_disabled_never_reaches_editor() {
        let editor = FakeEditor::new();
        let outcome = session(&editor).send_command("!rm -rf /").await.unwrap();
        assert_eq!(outcome, CommandOutcome::ShellDisabled);
        assert_eq!(editor.connections(), 0);
        assert!(editor.shell_commands().is_empty());
    }

    #[test]
    fn test_command_body_strips_colons_and_whitespace() {
        assert_eq!(command_body("::!ls"), "!ls");
        assert_eq!(command_body(" : !id "), "!id");
        assert_eq!(command_body("w"), "w");
    }

    #[test]
    fn test_is_shell_command() {
        assert!(is_shell_command("!ls"));
        assert!(is_shell_command(": !id"));
        assert!(is_shell_command("::!x"));
        assert!(is_shell_command("%!sort"));
        assert!(is_shell_command(":'<,'>!sort"));
        assert!(is_shell_command("1,3 !cat"));
        assert!(!is_shell_command("echo '!'"));
        assert!(!is_shell_command("w!"));
        assert!(!is_shell_command("'a"));
    }

    #[tokio::test]
    async fn test_prefixed_shell_commands_never_reach_editor() {
        let editor = FakeEditor::new();
        let session = session(&editor);
        for command in [": !id", "::!x", ":  !rm -rf /", "%!sort", ":'<,'>!sort"] {
            let outcome = session.send_command(command).await.unwrap();
            assert_eq!(outcome, CommandOutcome::ShellDisabled, "{command}");
        }
        assert_eq!(editor.connections(), 0);
        assert!(editor.executed().is_empty());
    }

    #[tokio::test]
    async fn test_filter_runs_as_ex_command_when_enabled() {
        let editor = FakeEditor::new();
        let session = session(&editor).with_shell_commands(true);
        session.send_command(":%!sort").await.unwrap();
        assert_eq!(editor.executed(), vec!["%!sort"]);
        assert!(editor.shell_commands().is_empty());
    }

    #[tokio::test]
    async fn test_command_clears_and_checks_errmsg() {
        let editor = FakeEditor::new();
        session(&editor).send_command("set number").await.unwrap();
        let methods: Vec<String> = editor.calls().into_iter().map(|c| c.method).collect();
        assert_eq!(methods, vec!["nvim_set_vvar", "nvim_exec2", "nvim_get_vvar"]);
    }

    #[tokio::test]
    async fn test_shell_enabled_runs_system() {
        let editor = FakeEditor::new();
        let session = session(&editor).with_shell_commands(true);
        let outcome = session.send_command(":!echo 'hi'").await.unwrap();
        assert_eq!(outcome, CommandOutcome::ShellOutput("echo 'hi'".into()));
        assert_eq!(editor.shell_commands(), vec!["echo 'hi'"]);
    }

    #[tokio::test]
    async fn test_find_files_is_shell_gated() {
        let editor = FakeEditor::new();
        let outcome = session(&editor).find_files("main.rs").await.unwrap();
        assert_eq!(outcome, CommandOutcome::ShellDisabled);

        let session = session(&editor).with_shell_commands(true);
        session.find_files("main.rs").await.unwrap();
        assert_eq!(
            editor.shell_commands(),
            vec!["find . -type f -name '*main.rs*' -not -path '*/.git/*'"]
        );
    }
}
