//! msgpack-RPC message framing.
//!
//! Neovim speaks msgpack-RPC: every message is a single msgpack array
//! `[type, ...]` with no length prefix, so frames are delimited by parsing.
//!
//! - request: `[0, msgid, method, params]`
//! - response: `[1, msgid, error, result]`
//! - notification: `[2, method, params]`

use std::io::Cursor;

use bytes::{Buf, BytesMut};
use rmpv::Value;

use nvim_mcp_core::{Error, Result};

const REQUEST: u64 = 0;
const RESPONSE: u64 = 1;
const NOTIFICATION: u64 = 2;

/// A decoded msgpack-RPC message.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Call expecting a response
    Request {
        /// Correlation id
        msgid: u32,
        /// Method name
        method: String,
        /// Positional arguments
        params: Vec<Value>,
    },
    /// Reply to a request
    Response {
        /// Correlation id of the request
        msgid: u32,
        /// Nil on success
        error: Value,
        /// Nil on failure
        result: Value,
    },
    /// Fire-and-forget event
    Notification {
        /// Event name
        method: String,
        /// Positional arguments
        params: Vec<Value>,
    },
}

impl Message {
    /// Serialize to msgpack bytes.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let value = match self {
            Message::Request {
                msgid,
                method,
                params,
            } => Value::Array(vec![
                Value::from(REQUEST),
                Value::from(*msgid),
                Value::from(method.as_str()),
                Value::Array(params.clone()),
            ]),
            Message::Response {
                msgid,
                error,
                result,
            } => Value::Array(vec![
                Value::from(RESPONSE),
                Value::from(*msgid),
                error.clone(),
                result.clone(),
            ]),
            Message::Notification { method, params } => Value::Array(vec![
                Value::from(NOTIFICATION),
                Value::from(method.as_str()),
                Value::Array(params.clone()),
            ]),
        };

        let mut bytes = Vec::new();
        rmpv::encode::write_value(&mut bytes, &value)
            .map_err(|e| Error::Rpc(format!("failed to encode message: {e}")))?;
        Ok(bytes)
    }

    /// Interpret a msgpack value as an RPC message.
    pub fn from_value(value: Value) -> Result<Self> {
        let items = match value {
            Value::Array(items) => items,
            other => return Err(Error::Rpc(format!("message is not an array: {other}"))),
        };

        let kind = items.first().and_then(Value::as_u64);
        let len = items.len();
        let mut fields = items.into_iter().skip(1);

        match (kind, len) {
            (Some(REQUEST), 4) => {
                let msgid = msgid(fields.next())?;
                let method = method(fields.next())?;
                let params = params(fields.next())?;
                Ok(Message::Request {
                    msgid,
                    method,
                    params,
                })
            }
            (Some(RESPONSE), 4) => {
                let msgid = msgid(fields.next())?;
                let error = fields.next().unwrap_or(Value::Nil);
                let result = fields.next().unwrap_or(Value::Nil);
                Ok(Message::Response {
                    msgid,
                    error,
                    result,
                })
            }
            (Some(NOTIFICATION), 3) => {
                let method = method(fields.next())?;
                let params = params(fields.next())?;
                Ok(Message::Notification { method, params })
            }
            _ => Err(Error::Rpc(format!(
                "unknown message shape: type={kind:?}, len={len}"
            ))),
        }
    }
}

fn msgid(value: Option<Value>) -> Result<u32> {
    value
        .as_ref()
        .and_then(Value::as_u64)
        .and_then(|id| u32::try_from(id).ok())
        .ok_or_else(|| Error::Rpc("invalid msgid".to_string()))
}

fn method(value: Option<Value>) -> Result<String> {
    value
        .as_ref()
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| Error::Rpc("invalid method name".to_string()))
}

fn params(value: Option<Value>) -> Result<Vec<Value>> {
    match value {
        Some(Value::Array(params)) => Ok(params),
        _ => Err(Error::Rpc("params must be an array".to_string())),
    }
}

/// Incremental decoder over a byte stream.
#[derive(Debug, Default)]
pub struct Decoder {
    buf: BytesMut,
}

impl Decoder {
    /// Create an empty decoder.
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(8192),
        }
    }

    /// Append bytes read from the transport.
    pub fn extend(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Bytes buffered but not yet decoded.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Decode the next complete message, or `None` if more bytes are needed.
    pub fn decode(&mut self) -> Result<Option<Message>> {
        if self.buf.is_empty() {
            return Ok(None);
        }

        let (result, consumed) = {
            let mut cursor = Cursor::new(&self.buf[..]);
            let result = rmpv::decode::read_value(&mut cursor);
            (result, cursor.position() as usize)
        };

        match result {
            Ok(value) => {
                self.buf.advance(consumed);
                Message::from_value(value).map(Some)
            }
            Err(e) if is_incomplete(&e) => Ok(None),
            Err(e) => Err(Error::Rpc(format!("malformed msgpack frame: {e}"))),
        }
    }
}

fn is_incomplete(err: &rmpv::decode::Error) -> bool {
    match err {
        rmpv::decode::Error::InvalidMarkerRead(io) | rmpv::decode::Error::InvalidDataRead(io) => {
            io.kind() == std::io::ErrorKind::UnexpectedEof
        }
        _ => false,
    }
}
