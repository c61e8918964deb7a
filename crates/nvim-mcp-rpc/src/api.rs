//! Typed wrappers over the Neovim RPC API methods used by the adapter.

use rmpv::Value;

use nvim_mcp_core::{Error, Result};

use crate::client::RpcClient;
use crate::value::{handle_id, map, map_get};

/// The current buffer / window / tabpage in API calls.
pub const CURRENT: i64 = 0;

/// One live connection with typed accessors.
pub struct Nvim {
    client: Box<dyn RpcClient>,
}

fn unexpected(method: &str, value: &Value) -> Error {
    Error::UnexpectedResponse {
        method: method.to_string(),
        detail: format!("got {value}"),
    }
}

fn string_of(method: &str, value: Value) -> Result<String> {
    match value {
        Value::String(s) => s
            .into_str()
            .ok_or_else(|| unexpected(method, &Value::from("<invalid utf-8>"))),
        Value::Nil => Ok(String::new()),
        other => Err(unexpected(method, &other)),
    }
}

fn int_of(method: &str, value: &Value) -> Result<i64> {
    value.as_i64().ok_or_else(|| unexpected(method, value))
}

fn bool_of(method: &str, value: &Value) -> Result<bool> {
    match value {
        Value::Boolean(b) => Ok(*b),
        Value::Integer(_) => Ok(value.as_i64() != Some(0)),
        other => Err(unexpected(method, other)),
    }
}

fn pair_of(method: &str, value: &Value) -> Result<[i64; 2]> {
    match value.as_array().map(Vec::as_slice) {
        Some([a, b]) => Ok([int_of(method, a)?, int_of(method, b)?]),
        _ => Err(unexpected(method, value)),
    }
}

impl Nvim {
    /// Wrap an established client.
    pub fn new(client: Box<dyn RpcClient>) -> Self {
        Self { client }
    }

    /// Raw request.
    pub async fn call(&mut self, method: &str, args: Vec<Value>) -> Result<Value> {
        self.client.call(method, args).await
    }

    /// `nvim_buf_get_lines(buf, start, end, false)`.
    pub async fn buf_get_lines(&mut self, buf: i64, start: i64, end: i64) -> Result<Vec<String>> {
        const METHOD: &str = "nvim_buf_get_lines";
        let reply = self
            .call(
                METHOD,
                vec![
                    Value::from(buf),
                    Value::from(start),
                    Value::from(end),
                    Value::Boolean(false),
                ],
            )
            .await?;
        match reply {
            Value::Array(lines) => lines
                .into_iter()
                .map(|line| string_of(METHOD, line))
                .collect(),
            other => Err(unexpected(METHOD, &other)),
        }
    }

    /// `nvim_buf_set_lines(buf, start, end, false, lines)`.
    pub async fn buf_set_lines(
        &mut self,
        buf: i64,
        start: i64,
        end: i64,
        lines: &[String],
    ) -> Result<()> {
        let replacement = lines.iter().map(|l| Value::from(l.as_str())).collect();
        self.call(
            "nvim_buf_set_lines",
            vec![
                Value::from(buf),
                Value::from(start),
                Value::from(end),
                Value::Boolean(false),
                Value::Array(replacement),
            ],
        )
        .await?;
        Ok(())
    }

    /// `nvim_buf_line_count(buf)`.
    pub async fn buf_line_count(&mut self, buf: i64) -> Result<i64> {
        const METHOD: &str = "nvim_buf_line_count";
        let reply = self.call(METHOD, vec![Value::from(buf)]).await?;
        int_of(METHOD, &reply)
    }

    /// `nvim_buf_get_name(buf)`.
    pub async fn buf_get_name(&mut self, buf: i64) -> Result<String> {
        const METHOD: &str = "nvim_buf_get_name";
        let reply = self.call(METHOD, vec![Value::from(buf)]).await?;
        string_of(METHOD, reply)
    }

    /// `nvim_buf_is_loaded(buf)`.
    pub async fn buf_is_loaded(&mut self, buf: i64) -> Result<bool> {
        const METHOD: &str = "nvim_buf_is_loaded";
        let reply = self.call(METHOD, vec![Value::from(buf)]).await?;
        bool_of(METHOD, &reply)
    }

    /// `nvim_buf_get_mark(buf, name)`; `(0, 0)` means unset.
    pub async fn buf_get_mark(&mut self, buf: i64, name: char) -> Result<[i64; 2]> {
        const METHOD: &str = "nvim_buf_get_mark";
        let reply = self
            .call(METHOD, vec![Value::from(buf), Value::from(name.to_string())])
            .await?;
        pair_of(METHOD, &reply)
    }

    /// `nvim_get_option_value(name, {buf = buf})`.
    pub async fn buf_get_option(&mut self, buf: i64, name: &str) -> Result<Value> {
        self.call(
            "nvim_get_option_value",
            vec![Value::from(name), map([("buf", Value::from(buf))])],
        )
        .await
    }

    /// Buffer-local option as a bool.
    pub async fn buf_get_bool_option(&mut self, buf: i64, name: &str) -> Result<bool> {
        let reply = self.buf_get_option(buf, name).await?;
        bool_of("nvim_get_option_value", &reply)
    }

    /// Buffer-local option as a string.
    pub async fn buf_get_string_option(&mut self, buf: i64, name: &str) -> Result<String> {
        let reply = self.buf_get_option(buf, name).await?;
        string_of("nvim_get_option_value", reply)
    }

    /// `nvim_list_bufs()` as buffer numbers.
    pub async fn list_bufs(&mut self) -> Result<Vec<i64>> {
        self.list_handles("nvim_list_bufs").await
    }

    /// `nvim_list_wins()` as window ids.
    pub async fn list_wins(&mut self) -> Result<Vec<i64>> {
        self.list_handles("nvim_list_wins").await
    }

    async fn list_handles(&mut self, method: &str) -> Result<Vec<i64>> {
        let reply = self.call(method, vec![]).await?;
        let handles = reply.as_array().ok_or_else(|| unexpected(method, &reply))?;
        handles
            .iter()
            .map(|h| handle_id(h).ok_or_else(|| unexpected(method, h)))
            .collect()
    }

    /// `nvim_win_get_buf(win)`.
    pub async fn win_get_buf(&mut self, win: i64) -> Result<i64> {
        const METHOD: &str = "nvim_win_get_buf";
        let reply = self.call(METHOD, vec![Value::from(win)]).await?;
        handle_id(&reply).ok_or_else(|| unexpected(METHOD, &reply))
    }

    /// `nvim_win_get_width(win)`.
    pub async fn win_get_width(&mut self, win: i64) -> Result<i64> {
        const METHOD: &str = "nvim_win_get_width";
        let reply = self.call(METHOD, vec![Value::from(win)]).await?;
        int_of(METHOD, &reply)
    }

    /// `nvim_win_get_height(win)`.
    pub async fn win_get_height(&mut self, win: i64) -> Result<i64> {
        const METHOD: &str = "nvim_win_get_height";
        let reply = self.call(METHOD, vec![Value::from(win)]).await?;
        int_of(METHOD, &reply)
    }

    /// `nvim_win_get_position(win)` as `[row, col]`.
    pub async fn win_get_position(&mut self, win: i64) -> Result<[i64; 2]> {
        const METHOD: &str = "nvim_win_get_position";
        let reply = self.call(METHOD, vec![Value::from(win)]).await?;
        pair_of(METHOD, &reply)
    }

    /// `nvim_win_get_cursor(win)` as `[line, col]` (1-based line, 0-based col).
    pub async fn win_get_cursor(&mut self, win: i64) -> Result<[i64; 2]> {
        const METHOD: &str = "nvim_win_get_cursor";
        let reply = self.call(METHOD, vec![Value::from(win)]).await?;
        pair_of(METHOD, &reply)
    }

    /// `nvim_win_set_cursor(win, [line, col])`.
    pub async fn win_set_cursor(&mut self, win: i64, line: i64, col: i64) -> Result<()> {
        self.call(
            "nvim_win_set_cursor",
            vec![
                Value::from(win),
                Value::Array(vec![Value::from(line), Value::from(col)]),
            ],
        )
        .await?;
        Ok(())
    }

    /// Number of the current tab page.
    pub async fn current_tab_number(&mut self) -> Result<i64> {
        let tab = self.call("nvim_get_current_tabpage", vec![]).await?;
        let reply = self.call("nvim_tabpage_get_number", vec![tab]).await?;
        int_of("nvim_tabpage_get_number", &reply)
    }

    /// Mode short name from `nvim_get_mode()`.
    pub async fn get_mode(&mut self) -> Result<String> {
        const METHOD: &str = "nvim_get_mode";
        let reply = self.call(METHOD, vec![]).await?;
        map_get(&reply, "mode")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| unexpected(METHOD, &reply))
    }

    /// `nvim_command(cmd)`.
    pub async fn command(&mut self, cmd: &str) -> Result<()> {
        self.call("nvim_command", vec![Value::from(cmd)]).await?;
        Ok(())
    }

    /// `nvim_exec2(src, {output = true})`, returning captured output.
    pub async fn exec_capture(&mut self, src: &str) -> Result<String> {
        const METHOD: &str = "nvim_exec2";
        let reply = self
            .call(
                METHOD,
                vec![Value::from(src), map([("output", Value::Boolean(true))])],
            )
            .await?;
        match map_get(&reply, "output") {
            Some(output) => string_of(METHOD, output.clone()),
            None => Ok(String::new()),
        }
    }

    /// `nvim_eval(expr)`.
    pub async fn eval(&mut self, expr: &str) -> Result<Value> {
        self.call("nvim_eval", vec![Value::from(expr)]).await
    }

    /// `nvim_eval(expr)` as a string.
    pub async fn eval_string(&mut self, expr: &str) -> Result<String> {
        let reply = self.eval(expr).await?;
        string_of("nvim_eval", reply)
    }

    /// `nvim_call_function(name, args)`.
    pub async fn call_function(&mut self, name: &str, args: Vec<Value>) -> Result<Value> {
        self.call(
            "nvim_call_function",
            vec![Value::from(name), Value::Array(args)],
        )
        .await
    }

    /// `nvim_call_function` returning a string.
    pub async fn call_function_string(&mut self, name: &str, args: Vec<Value>) -> Result<String> {
        let reply = self.call_function(name, args).await?;
        string_of("nvim_call_function", reply)
    }

    /// `getpos(expr)` as `[line, col]` with a 0-based column.
    pub async fn getpos(&mut self, expr: &str) -> Result<[i64; 2]> {
        const METHOD: &str = "getpos";
        let reply = self.call_function(METHOD, vec![Value::from(expr)]).await?;
        match reply.as_array().map(Vec::as_slice) {
            Some([_, line, col, ..]) => Ok([int_of(METHOD, line)?, int_of(METHOD, col)? - 1]),
            _ => Err(unexpected(METHOD, &reply)),
        }
    }

    /// `nvim_get_vvar(name)` as a string.
    pub async fn get_vvar_string(&mut self, name: &str) -> Result<String> {
        let reply = self.call("nvim_get_vvar", vec![Value::from(name)]).await?;
        string_of("nvim_get_vvar", reply)
    }

    /// `nvim_set_vvar(name, value)`.
    pub async fn set_vvar(&mut self, name: &str, value: Value) -> Result<()> {
        self.call("nvim_set_vvar", vec![Value::from(name), value])
            .await?;
        Ok(())
    }

    /// `nvim_feedkeys(keys, mode, false)`.
    pub async fn feedkeys(&mut self, keys: &str, mode: &str) -> Result<()> {
        self.call(
            "nvim_feedkeys",
            vec![Value::from(keys), Value::from(mode), Value::Boolean(false)],
        )
        .await?;
        Ok(())
    }
}
