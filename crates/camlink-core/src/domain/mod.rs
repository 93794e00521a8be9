//! Domain entities for camlink.
//!
//! Pure state with no I/O: the scene and the camera that incoming
//! transforms move.  Hosts own a [`camera::Scene`] and apply decoded
//! transforms to it on their own schedule.

pub mod camera;

pub use camera::{Camera, CameraInfo, Scene, SceneError};
