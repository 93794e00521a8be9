//! Application layer for camlink-server.
//!
//! Knows *what* happens to a decoded transform, but not how bytes arrive.
//!
//! # Responsibilities
//!
//! - The [`TransformSink`] seam between connection tasks and the host
//! - The channel hand-off ([`ChannelSink`] / [`TransformQueue`])
//! - Applying queued transforms to the scene camera on the host loop
//!
//! # What does NOT belong here?
//!
//! - Sockets, listeners, and task spawning (infrastructure)
//! - Frame and JSON decoding (camlink-core)

pub mod scene_applier;
pub mod sink;

pub use scene_applier::{SceneApplier, TickReport};
pub use sink::{transform_channel, ChannelSink, LoggingSink, SinkError, TransformQueue, TransformSink};
