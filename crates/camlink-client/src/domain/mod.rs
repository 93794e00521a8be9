//! Domain layer for camlink-client: pure pose generators.

pub mod motion;

pub use motion::{orbit_pose, test_sequence};
