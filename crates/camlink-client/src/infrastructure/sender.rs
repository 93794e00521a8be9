//! TCP sender that frames transforms and writes them to a server.

use std::net::SocketAddr;

use camlink_core::{write_frame, FrameError, TransformMessage};
use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info};

/// Errors that can occur while sending transforms.
#[derive(Debug, Error)]
pub enum SenderError {
    /// The TCP connection to the server could not be established.
    #[error("failed to connect to {addr}: {source}")]
    ConnectFailed {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// A frame could not be written.
    #[error("failed to send transform: {0}")]
    Send(#[from] FrameError),

    /// Shutting down the write side failed.
    #[error("failed to close connection: {0}")]
    Close(#[source] std::io::Error),
}

/// Streams framed transforms over one connection.
///
/// Generic over the writer so tests can substitute an in-memory stream;
/// production code uses [`TransformSender::connect`].
pub struct TransformSender<W = TcpStream> {
    writer: W,
    frames_sent: u64,
}

impl TransformSender<TcpStream> {
    /// Opens a TCP connection to `host:port`.
    ///
    /// # Errors
    ///
    /// Returns [`SenderError::ConnectFailed`] if the host cannot be resolved
    /// or the server refuses the connection.
    pub async fn connect(host: &str, port: u16) -> Result<Self, SenderError> {
        let stream = TcpStream::connect((host, port))
            .await
            .map_err(|source| SenderError::ConnectFailed {
                addr: format!("{host}:{port}"),
                source,
            })?;
        // Poses are tiny and latency matters more than packet count.
        if let Err(e) = stream.set_nodelay(true) {
            debug!("could not set TCP_NODELAY: {e}");
        }
        if let Ok(peer) = stream.peer_addr() {
            info!("connected to camlink server at {peer}");
        }
        Ok(Self::new(stream))
    }

    /// Address of the server this sender is connected to.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.writer.peer_addr().ok()
    }
}

impl<W> TransformSender<W>
where
    W: AsyncWrite + Unpin,
{
    /// Wraps an already-open writer.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            frames_sent: 0,
        }
    }

    /// Frames `transform` as JSON and writes it.
    ///
    /// # Errors
    ///
    /// Returns [`SenderError::Send`] if the write fails, typically because
    /// the server closed the connection.
    pub async fn send(&mut self, transform: &TransformMessage) -> Result<(), SenderError> {
        let payload = transform.to_json();
        write_frame(&mut self.writer, payload.as_bytes()).await?;
        self.frames_sent += 1;
        debug!("sent transform #{}: {payload}", self.frames_sent);
        Ok(())
    }

    /// Number of transforms written so far.
    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    /// Flushes and shuts down the write side.
    ///
    /// # Errors
    ///
    /// Returns [`SenderError::Close`] if the shutdown fails.
    pub async fn close(mut self) -> Result<u64, SenderError> {
        self.writer.shutdown().await.map_err(SenderError::Close)?;
        info!("disconnected after sending {} transform(s)", self.frames_sent);
        Ok(self.frames_sent)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
