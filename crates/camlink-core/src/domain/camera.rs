//! The host-side camera that incoming transforms drive.
//!
//! A [`Scene`] owns at most one active [`Camera`].  There is no queue or
//! history: applying a transform overwrites the previous pose, so the last
//! transform applied wins.

use thiserror::Error;
use tracing::{debug, info};

use crate::protocol::messages::TransformMessage;

/// Name given to a camera created on demand.
pub const DEFAULT_CAMERA_NAME: &str = "Camera";

/// Errors raised while applying a transform to the scene.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SceneError {
    /// The scene has no active camera to move.
    #[error("no active camera in scene")]
    NoCamera,
}

/// A camera object with a location and an XYZ Euler rotation in radians.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub name: String,
    pub location: [f64; 3],
    pub rotation_euler: [f64; 3],
}

impl Camera {
    /// Creates a camera at the origin with zero rotation.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: [0.0; 3],
            rotation_euler: [0.0; 3],
        }
    }

    /// Overwrites location and rotation together.
    pub fn set_transform(&mut self, transform: &TransformMessage) {
        self.location = transform.location();
        self.rotation_euler = transform.rotation();
    }

    /// Snapshot used for status output.
    pub fn info(&self) -> CameraInfo {
        CameraInfo {
            name: self.name.clone(),
            location: self.location,
            rotation: self.rotation_euler,
            rotation_degrees: self.rotation_euler.map(f64::to_degrees),
        }
    }
}

/// Read-only view of a camera, with rotation also expressed in degrees.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraInfo {
    pub name: String,
    pub location: [f64; 3],
    pub rotation: [f64; 3],
    pub rotation_degrees: [f64; 3],
}

/// The host scene: a single latest-value camera slot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    camera: Option<Camera>,
    revision: u64,
}

impl Scene {
    /// An empty scene with no camera.
    pub fn new() -> Self {
        Self::default()
    }

    /// A scene that already holds `camera` as its active camera.
    pub fn with_camera(camera: Camera) -> Self {
        Self {
            camera: Some(camera),
            revision: 0,
        }
    }

    /// The active camera, if any.
    pub fn camera(&self) -> Option<&Camera> {
        self.camera.as_ref()
    }

    /// Number of transforms applied since the scene was created.
    ///
    /// Hosts compare this between ticks to decide whether to redraw.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Applies `transform` to the active camera, location and rotation at once.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::NoCamera`] if there is no active camera.  The
    /// scene is left unchanged.
    pub fn apply_transform(&mut self, transform: &TransformMessage) -> Result<(), SceneError> {
        let camera = self.camera.as_mut().ok_or(SceneError::NoCamera)?;
        camera.set_transform(transform);
        self.revision = self.revision.wrapping_add(1);
        debug!(
            "applied transform to '{}': location={:?} rotation={:?}",
            camera.name, camera.location, camera.rotation_euler
        );
        Ok(())
    }

    /// Returns the active camera, creating one at the origin if the scene has none.
    pub fn create_camera_if_needed(&mut self) -> &mut Camera {
        self.camera.get_or_insert_with(|| {
            info!("created new camera: {DEFAULT_CAMERA_NAME}");
            Camera::new(DEFAULT_CAMERA_NAME)
        })
    }

    /// Moves the active camera back to the origin with zero rotation.
    ///
    /// Returns `false` when there is no camera to reset.
    pub fn reset_camera(&mut self) -> bool {
        match self.camera.as_mut() {
            Some(camera) => {
                camera.set_transform(&TransformMessage::default());
                self.revision = self.revision.wrapping_add(1);
                info!("camera '{}' reset to origin", camera.name);
                true
            }
            None => false,
        }
    }

    /// Snapshot of the active camera, if any.
    pub fn camera_info(&self) -> Option<CameraInfo> {
        self.camera.as_ref().map(Camera::info)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
