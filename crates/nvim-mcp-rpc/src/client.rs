//! Connections to a listening Neovim instance.
//!
//! A [`Connector`] dials the editor and hands back a fresh [`RpcClient`].
//! Callers connect once per unit of work; attaching to an editor started
//! with `--listen` is idempotent and never creates a new editor session.

use std::time::Duration;

use async_trait::async_trait;
use rmpv::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace, warn};

use nvim_mcp_core::{Error, Result};

use crate::codec::{Decoder, Message};
use crate::value::error_message;

/// Issues requests over one established connection.
#[async_trait]
pub trait RpcClient: Send {
    /// Send a request and wait for its response.
    ///
    /// An error response from the editor becomes [`Error::Remote`].
    async fn call(&mut self, method: &str, args: Vec<Value>) -> Result<Value>;
}

/// Opens connections to the editor.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Establish a new connection.
    async fn connect(&self) -> Result<Box<dyn RpcClient>>;

    /// Address being dialed, for diagnostics.
    fn address(&self) -> &str;
}

/// msgpack-RPC client over any byte stream.
pub struct MsgpackClient<S> {
    stream: S,
    decoder: Decoder,
    next_msgid: u32,
    timeout: Option<Duration>,
}

impl<S> MsgpackClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wrap a connected stream.
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            decoder: Decoder::new(),
            next_msgid: 1,
            timeout: None,
        }
    }

    /// Bound every round-trip by `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    async fn write_message(&mut self, message: &Message) -> Result<()> {
        let bytes = message.encode()?;
        self.stream.write_all(&bytes).await?;
        self.stream.flush().await?;
        Ok(())
    }

    async fn read_message(&mut self) -> Result<Message> {
        loop {
            if let Some(message) = self.decoder.decode()? {
                return Ok(message);
            }

            let mut chunk = [0u8; 4096];
            let n = self.stream.read(&mut chunk).await?;
            if n == 0 {
                return Err(Error::Rpc("connection closed by Neovim".to_string()));
            }
            self.decoder.extend(&chunk[..n]);
        }
    }

    async fn round_trip(&mut self, method: &str, args: Vec<Value>) -> Result<Value> {
        let msgid = self.next_msgid;
        self.next_msgid = self.next_msgid.wrapping_add(1);

        trace!("-> [{}] {} {:?}", msgid, method, args);
        self.write_message(&Message::Request {
            msgid,
            method: method.to_string(),
            params: args,
        })
        .await?;

        loop {
            match self.read_message().await? {
                Message::Response {
                    msgid: id,
                    error,
                    result,
                } if id == msgid => {
                    trace!("<- [{}] error={} result={}", id, error, result);
                    if error.is_nil() {
                        return Ok(result);
                    }
                    return Err(Error::Remote(error_message(&error)));
                }
                Message::Response { msgid: id, .. } => {
                    warn!("Discarding response for unknown request id: {}", id);
                }
                Message::Notification { method, .. } => {
                    debug!("Ignoring notification from Neovim: {}", method);
                }
                Message::Request {
                    msgid: id, method, ..
                } => {
                    // Reply so the editor does not block on us.
                    debug!("Rejecting request from Neovim: {} (id: {})", method, id);
                    self.write_message(&Message::Response {
                        msgid: id,
                        error: Value::from(format!("Method '{method}' not supported by client")),
                        result: Value::Nil,
                    })
                    .await?;
                }
            }
        }
    }
}

#[async_trait]
impl<S> RpcClient for MsgpackClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn call(&mut self, method: &str, args: Vec<Value>) -> Result<Value> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.round_trip(method, args))
                .await
                .map_err(|_| Error::Timeout(limit.as_millis() as u64))?,
            None => self.round_trip(method, args).await,
        }
    }
}

/// Dials a Unix socket path or a `host:port` TCP address.
#[derive(Debug, Clone)]
pub struct SocketConnector {
    address: String,
    timeout: Option<Duration>,
}

impl SocketConnector {
    /// Create a connector for `address`.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            timeout: None,
        }
    }

    /// Apply a per-request timeout to connections this connector opens.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Whether the address names a TCP endpoint rather than a socket file.
    pub fn is_tcp(&self) -> bool {
        is_tcp_address(&self.address)
    }

    fn connection_error(&self, err: std::io::Error) -> Error {
        Error::Connection {
            address: self.address.clone(),
            reason: err.to_string(),
        }
    }
}

fn is_tcp_address(address: &str) -> bool {
    !address.contains('/')
        && address
            .rsplit_once(':')
            .is_some_and(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok())
}

#[async_trait]
impl Connector for SocketConnector {
    async fn connect(&self) -> Result<Box<dyn RpcClient>> {
        debug!("Connecting to Neovim at {}", self.address);

        if self.is_tcp() {
            let stream = tokio::net::TcpStream::connect(&self.address)
                .await
                .map_err(|e| self.connection_error(e))?;
            return Ok(Box::new(
                MsgpackClient::new(stream).with_timeout(self.timeout),
            ));
        }

        #[cfg(unix)]
        {
            let stream = tokio::net::UnixStream::connect(&self.address)
                .await
                .map_err(|e| self.connection_error(e))?;
            Ok(Box::new(
                MsgpackClient::new(stream).with_timeout(self.timeout),
            ))
        }

        #[cfg(not(unix))]
        {
            Err(Error::Connection {
                address: self.address.clone(),
                reason: "Unix sockets are not available on this platform".to_string(),
            })
        }
    }

    fn address(&self) -> &str {
        &self.address
    }
}
