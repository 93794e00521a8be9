//! camlink-client library entry point.
//!
//! A test sender for camlink servers.  It frames camera transforms exactly
//! as a phone or tracking rig would and streams them over TCP.
//!
//! # Layers
//!
//! - `domain`: pose generators (fixed test sequence, orbit animation)
//! - `application`: pacing the poses onto a sender
//! - `infrastructure`: the [`TransformSender`](infrastructure::TransformSender)

/// Domain layer: motion patterns.
pub mod domain;

/// Application layer: sequence and animation playback.
pub mod application;

/// Infrastructure layer: TCP sender.
pub mod infrastructure;
