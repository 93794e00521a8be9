//! Application layer for camlink-client.
//!
//! Paces motion patterns onto a [`TransformSender`](crate::infrastructure::TransformSender).

pub mod playback;

pub use playback::{run_animation, run_sequence};
