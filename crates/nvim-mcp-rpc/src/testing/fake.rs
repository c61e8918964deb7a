//! In-memory stand-in for a listening Neovim instance.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use rmpv::Value;

use nvim_mcp_core::{Error, Result};

use crate::client::{Connector, RpcClient};
use crate::value::{ext_handle, handle_id, map, map_get, EXT_BUFFER, EXT_TABPAGE, EXT_WINDOW};

/// One RPC request as received by the fake.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    /// Method name
    pub method: String,
    /// Arguments
    pub args: Vec<Value>,
}

/// A buffer held by the fake editor.
#[derive(Debug, Clone)]
pub struct FakeBuffer {
    /// Buffer number
    pub id: i64,
    /// Full name
    pub name: String,
    /// Line array (never empty)
    pub lines: Vec<String>,
    /// `buflisted`
    pub listed: bool,
    /// Loaded into memory
    pub loaded: bool,
    /// `modified`
    pub modified: bool,
    /// `syntax`
    pub syntax: String,
}

impl FakeBuffer {
    /// A listed, loaded, unmodified buffer.
    pub fn new(id: i64, name: &str, lines: &[&str]) -> Self {
        let lines = if lines.is_empty() {
            vec![String::new()]
        } else {
            lines.iter().map(|l| l.to_string()).collect()
        };
        Self {
            id,
            name: name.to_string(),
            lines,
            listed: true,
            loaded: true,
            modified: false,
            syntax: String::new(),
        }
    }
}

/// A window held by the fake editor.
#[derive(Debug, Clone)]
pub struct FakeWindow {
    /// Window id
    pub id: i64,
    /// Buffer shown
    pub buffer: i64,
    /// Columns
    pub width: i64,
    /// Rows
    pub height: i64,
    /// Screen row
    pub row: i64,
    /// Screen column
    pub col: i64,
}

#[derive(Debug)]
struct FakeState {
    buffers: Vec<FakeBuffer>,
    current: usize,
    windows: Vec<FakeWindow>,
    cursor: (i64, i64),
    mode: String,
    visual_anchor: (i64, i64),
    marks: BTreeMap<char, (i64, i64)>,
    registers: BTreeMap<char, String>,
    errmsg: String,
    cwd: String,
    files: HashMap<String, Vec<String>>,
    command_outputs: HashMap<String, String>,
    failing_commands: HashMap<String, String>,
    silent_errors: HashMap<String, String>,
    failing_methods: HashMap<String, String>,
    calls: Vec<RecordedCall>,
    executed: Vec<String>,
    shell_commands: Vec<String>,
    connections: usize,
    refuse_connections: bool,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            buffers: vec![FakeBuffer::new(1, "", &[])],
            current: 0,
            windows: vec![FakeWindow {
                id: 1000,
                buffer: 1,
                width: 80,
                height: 24,
                row: 0,
                col: 0,
            }],
            cursor: (1, 0),
            mode: "n".to_string(),
            visual_anchor: (1, 0),
            marks: BTreeMap::new(),
            registers: BTreeMap::new(),
            errmsg: String::new(),
            cwd: "/home/user/project".to_string(),
            files: HashMap::new(),
            command_outputs: HashMap::new(),
            failing_commands: HashMap::new(),
            silent_errors: HashMap::new(),
            failing_methods: HashMap::new(),
            calls: Vec::new(),
            executed: Vec::new(),
            shell_commands: Vec::new(),
            connections: 0,
            refuse_connections: false,
        }
    }
}

/// Shared handle to the fake editor; clones see the same state.
#[derive(Debug, Clone, Default)]
pub struct FakeEditor {
    state: Arc<Mutex<FakeState>>,
}

impl FakeEditor {
    /// An editor with one empty, unnamed buffer in one window.
    pub fn new() -> Self {
        Self::default()
    }

    /// An editor whose current buffer holds `lines`.
    pub fn with_lines(lines: &[&str]) -> Self {
        let editor = Self::new();
        editor.state().buffers[0] = FakeBuffer::new(1, "", lines);
        editor
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lines of the current buffer.
    pub fn lines(&self) -> Vec<String> {
        let state = self.state();
        state.buffers[state.current].lines.clone()
    }

    /// Every request received so far.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state().calls.clone()
    }

    /// Number of requests received so far.
    pub fn call_count(&self) -> usize {
        self.state().calls.len()
    }

    /// Number of connections opened so far.
    pub fn connections(&self) -> usize {
        self.state().connections
    }

    /// Ex commands executed through `nvim_command` / `nvim_exec2`.
    pub fn executed(&self) -> Vec<String> {
        self.state().executed.clone()
    }

    /// Shell commands evaluated through `system()`.
    pub fn shell_commands(&self) -> Vec<String> {
        self.state().shell_commands.clone()
    }

    /// Current mode short name.
    pub fn mode(&self) -> String {
        self.state().mode.clone()
    }

    /// Cursor as `(line, col)`.
    pub fn cursor(&self) -> (i64, i64) {
        self.state().cursor
    }

    /// Position of a mark, if set.
    pub fn mark(&self, name: char) -> Option<(i64, i64)> {
        self.state().marks.get(&name).copied()
    }

    /// Content of a register, if set.
    pub fn register(&self, name: char) -> Option<String> {
        self.state().registers.get(&name).cloned()
    }

    /// Number of open windows.
    pub fn window_count(&self) -> usize {
        self.state().windows.len()
    }

    /// Set the mode reported by `nvim_get_mode`.
    pub fn set_mode(&self, mode: &str) {
        self.state().mode = mode.to_string();
    }

    /// Move the cursor.
    pub fn set_cursor(&self, line: i64, col: i64) {
        self.state().cursor = (line, col);
    }

    /// Set the visual-mode anchor (`getpos("v")`).
    pub fn set_visual_anchor(&self, line: i64, col: i64) {
        self.state().visual_anchor = (line, col);
    }

    /// Set a mark.
    pub fn set_mark(&self, name: char, line: i64, col: i64) {
        self.state().marks.insert(name, (line, col));
    }

    /// Set a register.
    pub fn set_register(&self, name: char, content: &str) {
        self.state().registers.insert(name, content.to_string());
    }

    /// Name the current buffer.
    pub fn set_buffer_name(&self, name: &str) {
        let mut state = self.state();
        let current = state.current;
        state.buffers[current].name = name.to_string();
    }

    /// Add another buffer.
    pub fn add_buffer(&self, buffer: FakeBuffer) {
        self.state().buffers.push(buffer);
    }

    /// Add another window.
    pub fn add_window(&self, window: FakeWindow) {
        self.state().windows.push(window);
    }

    /// Make `:edit path` load these lines.
    pub fn add_file(&self, path: &str, lines: &[&str]) {
        self.state()
            .files
            .insert(path.to_string(), lines.iter().map(|l| l.to_string()).collect());
    }

    /// Output captured when `command` runs.
    pub fn command_output(&self, command: &str, output: &str) {
        self.state()
            .command_outputs
            .insert(command.to_string(), output.to_string());
    }

    /// Make `command` fail with an error response.
    pub fn fail_command(&self, command: &str, message: &str) {
        self.state()
            .failing_commands
            .insert(command.to_string(), message.to_string());
    }

    /// Make `command` set `v:errmsg` without an error response.
    pub fn silent_error(&self, command: &str, message: &str) {
        self.state()
            .silent_errors
            .insert(command.to_string(), message.to_string());
    }

    /// Make every request for `method` fail.
    pub fn fail_method(&self, method: &str, message: &str) {
        self.state()
            .failing_methods
            .insert(method.to_string(), message.to_string());
    }

    /// Refuse new connections, as if the editor were not running.
    pub fn refuse_connections(&self) {
        self.state().refuse_connections = true;
    }
}

#[async_trait]
impl Connector for FakeEditor {
    async fn connect(&self) -> Result<Box<dyn RpcClient>> {
        let mut state = self.state();
        if state.refuse_connections {
            return Err(Error::Connection {
                address: "fake".to_string(),
                reason: "Connection refused".to_string(),
            });
        }
        state.connections += 1;
        Ok(Box::new(FakeClient {
            editor: self.clone(),
        }))
    }

    fn address(&self) -> &str {
        "fake"
    }
}

struct FakeClient {
    editor: FakeEditor,
}

#[async_trait]
impl RpcClient for FakeClient {
    async fn call(&mut self, method: &str, args: Vec<Value>) -> Result<Value> {
        let mut state = self.editor.state();
        state.calls.push(RecordedCall {
            method: method.to_string(),
            args: args.clone(),
        });
        if let Some(message) = state.failing_methods.get(method) {
            return Err(Error::Remote(message.clone()));
        }
        state.dispatch(method, &args)
    }
}

fn remote(message: &str) -> Error {
    Error::Remote(message.to_string())
}

fn arg_i64(args: &[Value], idx: usize) -> Result<i64> {
    args.get(idx)
        .and_then(handle_id)
        .ok_or_else(|| remote("Wrong type for argument"))
}

fn arg_str(args: &[Value], idx: usize) -> Result<&str> {
    args.get(idx)
        .and_then(Value::as_str)
        .ok_or_else(|| remote("Wrong type for argument"))
}

/// Parse a Vim single-quoted literal at the start of `s`, returning it and the rest.
fn parse_single_quoted(s: &str) -> Option<(String, &str)> {
    let body = s.strip_prefix('\'')?;
    let mut out = String::new();
    let mut chars = body.char_indices().peekable();
    while let Some((idx, ch)) = chars.next() {
        if ch == '\'' {
            if matches!(chars.peek(), Some((_, '\''))) {
                chars.next();
                out.push('\'');
            } else {
                return Some((out, &body[idx + 1..]));
            }
        } else {
            out.push(ch);
        }
    }
    None
}

impl FakeState {
    fn buffer_index(&self, id: i64) -> Result<usize> {
        if id == 0 {
            return Ok(self.current);
        }
        self.buffers
            .iter()
            .position(|b| b.id == id)
            .ok_or_else(|| remote("Invalid buffer id"))
    }

    fn window(&self, id: i64) -> Result<&FakeWindow> {
        let id = if id == 0 { self.windows[0].id } else { id };
        self.windows
            .iter()
            .find(|w| w.id == id)
            .ok_or_else(|| remote("Invalid window id"))
    }

    fn line_range(len: usize, start: i64, end: i64) -> Result<(usize, usize)> {
        let resolve = |idx: i64| -> Result<usize> {
            let resolved = if idx < 0 { len as i64 + 1 + idx } else { idx };
            if resolved < 0 || resolved > len as i64 {
                return Err(remote("Index out of bounds"));
            }
            Ok(resolved as usize)
        };
        let (start, end) = (resolve(start)?, resolve(end)?);
        if start > end {
            return Err(remote("'start' is higher than 'end'"));
        }
        Ok((start, end))
    }

    fn dispatch(&mut self, method: &str, args: &[Value]) -> Result<Value> {
        match method {
            "nvim_buf_get_lines" => {
                let buf = self.buffer_index(arg_i64(args, 0)?)?;
                let lines = &self.buffers[buf].lines;
                let (start, end) = Self::line_range(lines.len(), arg_i64(args, 1)?, arg_i64(args, 2)?)?;
                Ok(Value::Array(
                    lines[start..end]
                        .iter()
                        .map(|l| Value::from(l.as_str()))
                        .collect(),
                ))
            }
            "nvim_buf_set_lines" => {
                let buf = self.buffer_index(arg_i64(args, 0)?)?;
                let replacement: Vec<String> = args
                    .get(4)
                    .and_then(Value::as_array)
                    .ok_or_else(|| remote("Wrong type for argument 5"))?
                    .iter()
                    .map(|v| v.as_str().unwrap_or_default().to_string())
                    .collect();
                let buffer = &mut self.buffers[buf];
                let (start, end) =
                    Self::line_range(buffer.lines.len(), arg_i64(args, 1)?, arg_i64(args, 2)?)?;
                buffer.lines.splice(start..end, replacement);
                if buffer.lines.is_empty() {
                    buffer.lines.push(String::new());
                }
                buffer.modified = true;
                let len = buffer.lines.len() as i64;
                if self.cursor.0 > len {
                    self.cursor = (len, 0);
                }
                Ok(Value::Nil)
            }
            "nvim_buf_line_count" => {
                let buf = self.buffer_index(arg_i64(args, 0)?)?;
                Ok(Value::from(self.buffers[buf].lines.len() as i64))
            }
            "nvim_buf_get_name" => {
                let buf = self.buffer_index(arg_i64(args, 0)?)?;
                Ok(Value::from(self.buffers[buf].name.as_str()))
            }
            "nvim_buf_is_loaded" => {
                let buf = self.buffer_index(arg_i64(args, 0)?)?;
                Ok(Value::Boolean(self.buffers[buf].loaded))
            }
            "nvim_get_option_value" => {
                let name = arg_str(args, 0)?;
                let buf_id = args
                    .get(1)
                    .and_then(|opts| map_get(opts, "buf"))
                    .and_then(handle_id)
                    .unwrap_or(0);
                let buffer = &self.buffers[self.buffer_index(buf_id)?];
                match name {
                    "buflisted" => Ok(Value::Boolean(buffer.listed)),
                    "modified" => Ok(Value::Boolean(buffer.modified)),
                    "syntax" => Ok(Value::from(buffer.syntax.as_str())),
                    _ => Err(remote("Invalid option name")),
                }
            }
            "nvim_buf_get_mark" => {
                let name = arg_str(args, 1)?;
                let mark = name.chars().next().ok_or_else(|| remote("Invalid mark name"))?;
                let (line, col) = self.marks.get(&mark).copied().unwrap_or((0, 0));
                Ok(Value::Array(vec![Value::from(line), Value::from(col)]))
            }
            "nvim_list_bufs" => Ok(Value::Array(
                self.buffers
                    .iter()
                    .map(|b| ext_handle(EXT_BUFFER, b.id))
                    .collect(),
            )),
            "nvim_list_wins" => Ok(Value::Array(
                self.windows
                    .iter()
                    .map(|w| ext_handle(EXT_WINDOW, w.id))
                    .collect(),
            )),
            "nvim_win_get_buf" => {
                let window = self.window(arg_i64(args, 0)?)?;
                Ok(ext_handle(EXT_BUFFER, window.buffer))
            }
            "nvim_win_get_width" => Ok(Value::from(self.window(arg_i64(args, 0)?)?.width)),
            "nvim_win_get_height" => Ok(Value::from(self.window(arg_i64(args, 0)?)?.height)),
            "nvim_win_get_position" => {
                let window = self.window(arg_i64(args, 0)?)?;
                Ok(Value::Array(vec![
                    Value::from(window.row),
                    Value::from(window.col),
                ]))
            }
            "nvim_win_get_cursor" => Ok(Value::Array(vec![
                Value::from(self.cursor.0),
                Value::from(self.cursor.1),
            ])),
            "nvim_win_set_cursor" => {
                let pos = args
                    .get(1)
                    .and_then(Value::as_array)
                    .ok_or_else(|| remote("Wrong type for argument 2"))?;
                let line = pos.first().and_then(Value::as_i64).unwrap_or(0);
                let col = pos.get(1).and_then(Value::as_i64).unwrap_or(0);
                let len = self.buffers[self.current].lines.len() as i64;
                if line < 1 || line > len {
                    return Err(remote("Cursor position outside buffer"));
                }
                self.cursor = (line, col);
                Ok(Value::Nil)
            }
            "nvim_get_current_tabpage" => Ok(ext_handle(EXT_TABPAGE, 1)),
            "nvim_tabpage_get_number" => Ok(Value::from(1)),
            "nvim_get_mode" => Ok(map([
                ("mode", Value::from(self.mode.as_str())),
                ("blocking", Value::Boolean(false)),
            ])),
            "nvim_command" => {
                let cmd = arg_str(args, 0)?.to_string();
                self.run_ex(&cmd)?;
                Ok(Value::Nil)
            }
            "nvim_exec2" => {
                let cmd = arg_str(args, 0)?.to_string();
                let output = self.run_ex(&cmd)?;
                Ok(map([("output", Value::from(output))]))
            }
            "nvim_eval" => {
                let expr = arg_str(args, 0)?.to_string();
                self.eval(&expr)
            }
            "nvim_call_function" => {
                let name = arg_str(args, 0)?.to_string();
                let fargs = args
                    .get(1)
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default();
                self.call_function(&name, &fargs)
            }
            "nvim_get_vvar" => match arg_str(args, 0)? {
                "errmsg" => Ok(Value::from(self.errmsg.as_str())),
                _ => Err(remote("Key not found")),
            },
            "nvim_set_vvar" => {
                if arg_str(args, 0)? == "errmsg" {
                    self.errmsg = arg_str(args, 1)?.to_string();
                }
                Ok(Value::Nil)
            }
            "nvim_feedkeys" => {
                match arg_str(args, 0)? {
                    "v" => {
                        self.mode = "v".to_string();
                        self.visual_anchor = self.cursor;
                    }
                    "\u{1b}" => self.mode = "n".to_string(),
                    _ => {}
                }
                Ok(Value::Nil)
            }
            _ => Err(remote(&format!("Invalid method: {method}"))),
        }
    }

    fn run_ex(&mut self, cmd: &str) -> Result<String> {
        self.executed.push(cmd.to_string());

        if let Some(message) = self.failing_commands.get(cmd) {
            self.errmsg = message.clone();
            return Err(remote(message));
        }
        if let Some(message) = self.silent_errors.get(cmd) {
            self.errmsg = message.clone();
            return Ok(String::new());
        }

        if let Some(mark) = cmd.strip_prefix("normal! m").and_then(|m| m.chars().next()) {
            self.marks.insert(mark, self.cursor);
        } else if let Some(path) = cmd.strip_prefix("edit ") {
            let path = path.replace("\\ ", " ");
            let lines = self
                .files
                .get(&path)
                .cloned()
                .unwrap_or_else(|| vec![String::new()]);
            let buffer = &mut self.buffers[self.current];
            buffer.name = path;
            buffer.lines = lines;
            buffer.modified = false;
            self.cursor = (1, 0);
        } else if cmd.starts_with("split") || cmd.starts_with("vsplit") {
            let id = self.windows.iter().map(|w| w.id).max().unwrap_or(999) + 1;
            let buffer = self.buffers[self.current].id;
            self.windows.push(FakeWindow {
                id,
                buffer,
                width: 80,
                height: 12,
                row: 0,
                col: 0,
            });
        } else if cmd == "only" {
            self.windows.truncate(1);
        } else if cmd == "close" {
            if self.windows.len() == 1 {
                let message = "Vim(close):E444: Cannot close last window";
                self.errmsg = message.to_string();
                return Err(remote(message));
            }
            self.windows.pop();
        }

        Ok(self.command_outputs.get(cmd).cloned().unwrap_or_default())
    }

    fn eval(&mut self, expr: &str) -> Result<Value> {
        if let Some(rest) = expr.strip_prefix("system(") {
            let (command, tail) =
                parse_single_quoted(rest).ok_or_else(|| remote("E116: Invalid arguments"))?;
            if tail != ")" {
                return Err(remote("E116: Invalid arguments"));
            }
            self.shell_commands.push(command.clone());
            return Ok(Value::from(format!("{command}\n")));
        }

        if let Some(rest) = expr.strip_prefix("setreg(") {
            let (name, tail) =
                parse_single_quoted(rest).ok_or_else(|| remote("E116: Invalid arguments"))?;
            let tail = tail
                .strip_prefix(", ")
                .ok_or_else(|| remote("E116: Invalid arguments"))?;
            let (content, tail) =
                parse_single_quoted(tail).ok_or_else(|| remote("E116: Invalid arguments"))?;
            if tail != ")" {
                return Err(remote("E116: Invalid arguments"));
            }
            let register = name.chars().next().ok_or_else(|| remote("E354: Invalid register name"))?;
            self.registers.insert(register, content);
            return Ok(Value::from(0));
        }

        Err(remote(&format!("E121: Undefined variable: {expr}")))
    }

    fn call_function(&mut self, name: &str, args: &[Value]) -> Result<Value> {
        match name {
            "getcwd" => Ok(Value::from(self.cwd.as_str())),
            "getreg" => {
                let register = arg_str(args, 0)?
                    .chars()
                    .next()
                    .ok_or_else(|| remote("E354: Invalid register name"))?;
                Ok(Value::from(
                    self.registers.get(&register).cloned().unwrap_or_default(),
                ))
            }
            "winlayout" => Ok(Value::Array(vec![
                Value::from("leaf"),
                Value::from(self.windows[0].id),
            ])),
            "getpos" => {
                let (line, col) = match arg_str(args, 0)? {
                    "v" => self.visual_anchor,
                    "." => self.cursor,
                    _ => (0, 0),
                };
                Ok(Value::Array(vec![
                    Value::from(0),
                    Value::from(line),
                    Value::from(col + 1),
                    Value::from(0),
                ]))
            }
            "fnameescape" => Ok(Value::from(arg_str(args, 0)?.replace(' ', "\\ "))),
            _ => Err(remote(&format!("E117: Unknown function: {name}"))),
        }
    }
}
