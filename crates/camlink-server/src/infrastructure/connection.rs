//! Per-connection handler: frames in, transforms out.
//!
//! Each accepted client gets one task running [`handle_connection`].  The
//! task reads length-prefixed frames until the peer closes, the stream
//! breaks, or the server shuts down.  Every complete frame is decoded and
//! handed to the shared [`TransformSink`].
//!
//! # Failure isolation
//!
//! | Failure                         | Effect                                |
//! |---------------------------------|---------------------------------------|
//! | Payload fails to decode         | logged, frame skipped, keep reading   |
//! | Sink rejects the transform      | logged, keep reading                  |
//! | Stream closes mid-frame         | connection closed                     |
//! | Length prefix over the limit    | connection closed                     |
//! | Read error                      | connection closed                     |
//!
//! None of these reach the accept loop or any other connection.

use std::net::SocketAddr;
use std::sync::Arc;

use camlink_core::{decode_transform, FrameError, FrameReader};
use tokio::io::AsyncRead;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::application::sink::TransformSink;

/// Why a connection ended.
#[derive(Debug)]
pub enum ConnectionEnd {
    /// The client closed the stream between frames.
    PeerClosed,
    /// The server was stopped while the connection was open.
    Shutdown,
    /// The stream broke or violated framing.
    Failed(FrameError),
}

/// Counters for one connection, logged when it closes.
#[derive(Debug)]
pub struct ConnectionSummary {
    pub peer_addr: SocketAddr,
    /// Complete frames read off the wire.
    pub frames_received: u64,
    /// Transforms the sink accepted.
    pub transforms_applied: u64,
    /// Frames whose payload did not decode.
    pub frames_rejected: u64,
    /// Transforms the sink refused.
    pub sink_errors: u64,
    pub end: ConnectionEnd,
}

impl ConnectionSummary {
    fn new(peer_addr: SocketAddr) -> Self {
        Self {
            peer_addr,
            frames_received: 0,
            transforms_applied: 0,
            frames_rejected: 0,
            sink_errors: 0,
            end: ConnectionEnd::PeerClosed,
        }
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Serves one client until it disconnects or `shutdown` becomes `true`.
///
/// Never returns an error: every failure is confined to this connection and
/// recorded in the returned [`ConnectionSummary`].
///
/// Dropping the shutdown sender also ends the connection.
pub async fn handle_connection<S>(
    stream: S,
    peer_addr: SocketAddr,
    sink: Arc<dyn TransformSink>,
    max_frame_len: usize,
    mut shutdown: watch::Receiver<bool>,
) -> ConnectionSummary
where
    S: AsyncRead + Unpin,
{
    let mut reader = FrameReader::new(stream, max_frame_len);
    let mut summary = ConnectionSummary::new(peer_addr);

    loop {
        let next = tokio::select! {
            biased;
            _ = shutdown_requested(&mut shutdown) => {
                summary.end = ConnectionEnd::Shutdown;
                break;
            }
            next = reader.next_frame() => next,
        };

        let payload = match next {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                summary.end = ConnectionEnd::PeerClosed;
                break;
            }
            Err(e) => {
                summary.end = ConnectionEnd::Failed(e);
                break;
            }
        };
        summary.frames_received += 1;

        let transform = match decode_transform(&payload) {
            Ok(transform) => transform,
            Err(e) => {
                summary.frames_rejected += 1;
                warn!("client {peer_addr}: rejected frame ({} bytes): {e}", payload.len());
                continue;
            }
        };

        match sink.apply(transform) {
            Ok(()) => {
                summary.transforms_applied += 1;
                debug!("client {peer_addr}: forwarded transform {transform:?}");
            }
            Err(e) => {
                summary.sink_errors += 1;
                warn!("client {peer_addr}: transform not applied: {e}");
            }
        }
    }

    log_summary(&summary);
    summary
}

/// Resolves once the shutdown flag is `true` or its sender is gone.
pub(crate) async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

fn log_summary(summary: &ConnectionSummary) {
    let peer = summary.peer_addr;
    let counts = format!(
        "{} frame(s), {} applied, {} rejected, {} sink error(s)",
        summary.frames_received,
        summary.transforms_applied,
        summary.frames_rejected,
        summary.sink_errors
    );
    match &summary.end {
        ConnectionEnd::PeerClosed => info!("client {peer} disconnected: {counts}"),
        ConnectionEnd::Shutdown => info!("client {peer} closed by server shutdown: {counts}"),
        ConnectionEnd::Failed(e) => warn!("client {peer} connection closed with error: {e}; {counts}"),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
