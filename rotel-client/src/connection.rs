//! Transport abstraction for the control connection.
//!
//! A [`Connector`] opens a [`Connection`], which is immediately split into a
//! [`ConnectionReader`] owned by the receive loop and a [`ConnectionWriter`]
//! owned by the client. Tests substitute in-memory connectors.

use std::io;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

use crate::error::{ClientError, ReadError, Result};

type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Opens duplex byte streams to a device.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Open a connection to `host:port`.
    async fn open(&self, host: &str, port: u16) -> Result<Connection>;
}

/// The default connector, dialling plain TCP.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

#[async_trait]
impl Connector for TcpConnector {
    async fn open(&self, host: &str, port: u16) -> Result<Connection> {
        let addr = format!("{host}:{port}");
        let stream = TcpStream::connect(&addr)
            .await
            .map_err(|source| ClientError::Connect {
                addr: addr.clone(),
                source,
            })?;

        // Commands are tiny; don't let Nagle hold them back.
        if let Err(e) = stream.set_nodelay(true) {
            debug!("Could not disable Nagle on {}: {}", addr, e);
        }

        let (reader, writer) = stream.into_split();
        Ok(Connection::new(reader, writer))
    }
}

/// An open duplex byte stream.
pub struct Connection {
    reader: BoxedReader,
    writer: BoxedWriter,
}

impl Connection {
    /// Wrap any read half and write half into a connection.
    pub fn new<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            reader: Box::new(reader),
            writer: Box::new(writer),
        }
    }

    /// Split into independently owned halves.
    pub fn split(self) -> (ConnectionReader, ConnectionWriter) {
        (
            ConnectionReader {
                inner: self.reader,
            },
            ConnectionWriter {
                inner: Some(self.writer),
            },
        )
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection").finish_non_exhaustive()
    }
}

/// Read half of a connection.
pub struct ConnectionReader {
    inner: BoxedReader,
}

impl ConnectionReader {
    /// Read up to `buf.len()` bytes.
    ///
    /// A zero-length read means the peer closed the stream and is reported
    /// as [`ReadError::Closed`].
    pub async fn receive(&mut self, buf: &mut [u8]) -> std::result::Result<usize, ReadError> {
        match self.inner.read(buf).await? {
            0 => Err(ReadError::Closed),
            n => Ok(n),
        }
    }
}

/// Write half of a connection.
pub struct ConnectionWriter {
    inner: Option<BoxedWriter>,
}

impl ConnectionWriter {
    /// Write all bytes and flush them.
    pub async fn send(&mut self, bytes: &[u8]) -> Result<()> {
        let writer = self.inner.as_mut().ok_or(ClientError::NotConnected)?;
        writer.write_all(bytes).await.map_err(ClientError::Send)?;
        writer.flush().await.map_err(ClientError::Send)
    }

    /// Shut the stream down. Calling this more than once is a no-op.
    pub async fn close(&mut self) {
        if let Some(mut writer) = self.inner.take() {
            if let Err(e) = writer.shutdown().await {
                if e.kind() != io::ErrorKind::NotConnected {
                    debug!("Error while closing connection: {}", e);
                }
            }
        }
    }

    pub fn is_open(&self) -> bool {
        self.inner.is_some()
    }
}
