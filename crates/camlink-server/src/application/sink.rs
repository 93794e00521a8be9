//! Transform sinks: where decoded transforms go.
//!
//! Connection handlers run on the Tokio thread pool, but the scene must only
//! be touched from the host's own loop.  The [`TransformSink`] trait is the
//! seam between the two: handlers call [`TransformSink::apply`] and the sink
//! decides how the transform reaches the host.
//!
//! - [`ChannelSink`] hands each transform to a [`TransformQueue`] that the
//!   host drains once per tick.  This is the normal production sink.
//! - [`LoggingSink`] logs each transform and applies nothing.  Used when the
//!   server runs without a host scene.

use camlink_core::domain::camera::SceneError;
use camlink_core::TransformMessage;
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TryRecvError};
use tracing::info;

/// Errors a sink may report for a single transform.
///
/// A sink error never closes the connection that produced the transform.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SinkError {
    /// There is no active camera to receive the transform.
    #[error("no active camera in scene")]
    NoCamera,

    /// The host side of the hand-off has gone away.
    #[error("transform queue is closed; host is no longer draining")]
    Disconnected,
}

impl From<SceneError> for SinkError {
    fn from(err: SceneError) -> Self {
        match err {
            SceneError::NoCamera => SinkError::NoCamera,
        }
    }
}

/// Receives decoded transforms from connection handlers.
///
/// Implementations must be cheap and non-blocking: `apply` is called inline
/// on the connection task between reads.
#[cfg_attr(test, mockall::automock)]
pub trait TransformSink: Send + Sync {
    /// Delivers one transform.
    ///
    /// # Errors
    ///
    /// Returns a [`SinkError`] when the transform cannot be delivered.  The
    /// caller logs it and carries on with the next frame.
    fn apply(&self, transform: TransformMessage) -> Result<(), SinkError>;
}

// ── Channel hand-off ──────────────────────────────────────────────────────────

/// Creates a connected sink/queue pair.
///
/// The channel is unbounded: transforms are tiny and the host drains every
/// tick, so a bound would only add a back-pressure path into the network
/// tasks.
pub fn transform_channel() -> (ChannelSink, TransformQueue) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ChannelSink { tx }, TransformQueue { rx })
}

/// Sending half of the hand-off, shared by every connection handler.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<TransformMessage>,
}

impl TransformSink for ChannelSink {
    fn apply(&self, transform: TransformMessage) -> Result<(), SinkError> {
        self.tx.send(transform).map_err(|_| SinkError::Disconnected)
    }
}

/// Receiving half of the hand-off, owned by the host loop.
#[derive(Debug)]
pub struct TransformQueue {
    rx: mpsc::UnboundedReceiver<TransformMessage>,
}

impl TransformQueue {
    /// Removes and returns every transform queued so far, oldest first.
    ///
    /// Never waits.  Returns an empty vector when nothing is pending.
    pub fn drain(&mut self) -> Vec<TransformMessage> {
        let mut pending = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(transform) => pending.push(transform),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        pending
    }
}

// ── Logging sink ──────────────────────────────────────────────────────────────

/// Logs each transform at `info` and applies nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingSink;

impl TransformSink for LoggingSink {
    fn apply(&self, transform: TransformMessage) -> Result<(), SinkError> {
        info!(
            "received transform: location=({}, {}, {}) rotation=({}, {}, {})",
            transform.x, transform.y, transform.z, transform.rot_x, transform.rot_y, transform.rot_z
        );
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn at_x(x: f64) -> TransformMessage {
        TransformMessage::new([x, 0.0, 0.0], [0.0; 3])
    }

    #[test]
    fn test_drain_returns_transforms_in_send_order() {
        // Arrange
        let (sink, mut queue) = transform_channel();
        sink.apply(at_x(1.0)).unwrap();
        sink.apply(at_x(2.0)).unwrap();
        sink.apply(at_x(3.0)).unwrap();

        // Act
        let drained = queue.drain();

        // Assert
        let xs: Vec<f64> = drained.iter().map(|t| t.x).collect();
        assert_eq!(xs, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_drain_on_empty_queue_returns_nothing() {
        let (_sink, mut queue) = transform_channel();
        assert!(queue.drain().is_empty());
    }

    #[test]
    fn test_drain_empties_the_queue() {
        let (sink, mut queue) = transform_channel();
        sink.apply(at_x(1.0)).unwrap();

        assert_eq!(queue.drain().len(), 1);
        assert!(queue.drain().is_empty());
    }

    #[test]
    fn test_cloned_sinks_feed_the_same_queue() {
        let (sink, mut queue) = transform_channel();
        let other = sink.clone();

        sink.apply(at_x(1.0)).unwrap();
        other.apply(at_x(2.0)).unwrap();

        assert_eq!(queue.drain().len(), 2);
    }

    #[test]
    fn test_apply_after_queue_dropped_is_disconnected() {
        let (sink, queue) = transform_channel();
        drop(queue);

        assert_eq!(sink.apply(at_x(1.0)), Err(SinkError::Disconnected));
    }

    #[test]
    fn test_logging_sink_always_accepts() {
        assert_eq!(LoggingSink.apply(at_x(1.0)), Ok(()));
    }

    #[test]
    fn test_scene_error_maps_to_no_camera() {
        assert_eq!(SinkError::from(SceneError::NoCamera), SinkError::NoCamera);
    }
}
