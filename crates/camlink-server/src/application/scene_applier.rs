//! Host-side application of queued transforms to the scene.
//!
//! [`SceneApplier`] runs on the host loop, never on a connection task.  Each
//! tick it drains the [`TransformQueue`] and applies the transforms in
//! arrival order, so the camera ends the tick at the most recent pose.

use camlink_core::domain::camera::{CameraInfo, Scene};
use camlink_core::TransformMessage;
use tracing::{debug, warn};

use crate::application::sink::{SinkError, TransformQueue};

/// Outcome of one host tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Transforms applied to the camera.
    pub applied: usize,
    /// Transforms dropped because there was no camera.
    pub discarded: usize,
}

/// Owns the scene and applies transforms to its camera.
#[derive(Debug)]
pub struct SceneApplier {
    scene: Scene,
    create_camera_if_missing: bool,
}

impl SceneApplier {
    pub fn new(scene: Scene, create_camera_if_missing: bool) -> Self {
        Self {
            scene,
            create_camera_if_missing,
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Applies one transform to the active camera.
    ///
    /// When the scene has no camera, one is created first if the applier
    /// was built with `create_camera_if_missing`.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::NoCamera`] if there is no camera and creation is
    /// disabled.
    pub fn apply(&mut self, transform: &TransformMessage) -> Result<(), SinkError> {
        if self.create_camera_if_missing {
            self.scene.create_camera_if_needed();
        }
        self.scene.apply_transform(transform)?;
        Ok(())
    }

    /// Drains `queue` and applies everything in it.
    ///
    /// A transform that cannot be applied is logged and dropped; later
    /// transforms in the same tick are still applied.
    pub fn apply_pending(&mut self, queue: &mut TransformQueue) -> TickReport {
        let mut report = TickReport::default();
        for transform in queue.drain() {
            match self.apply(&transform) {
                Ok(()) => report.applied += 1,
                Err(e) => {
                    report.discarded += 1;
                    warn!("dropping transform: {e}");
                }
            }
        }
        if report.applied > 0 {
            debug!(
                "tick applied {} transform(s), scene revision {}",
                report.applied,
                self.scene.revision()
            );
        }
        report
    }

    pub fn camera_info(&self) -> Option<CameraInfo> {
        self.scene.camera_info()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::sink::{transform_channel, TransformSink};
    use camlink_core::domain::camera::{Camera, DEFAULT_CAMERA_NAME};

    fn pose(x: f64, rot_z: f64) -> TransformMessage {
        TransformMessage::new([x, 1.0, 2.0], [0.0, 0.0, rot_z])
    }

    #[test]
    fn test_apply_pending_leaves_camera_at_latest_pose() {
        // Arrange
        let (sink, mut queue) = transform_channel();
        let mut applier = SceneApplier::new(Scene::with_camera(Camera::new("Main")), false);
        sink.apply(pose(1.0, 0.1)).unwrap();
        sink.apply(pose(2.0, 0.2)).unwrap();

        // Act
        let report = applier.apply_pending(&mut queue);

        // Assert
        assert_eq!(report, TickReport { applied: 2, discarded: 0 });
        let camera = applier.scene().camera().unwrap();
        assert_eq!(camera.location, [2.0, 1.0, 2.0]);
        assert_eq!(camera.rotation_euler, [0.0, 0.0, 0.2]);
    }

    #[test]
    fn test_missing_camera_is_created_when_enabled() {
        let mut applier = SceneApplier::new(Scene::new(), true);

        applier.apply(&pose(3.0, 0.0)).unwrap();

        let info = applier.camera_info().unwrap();
        assert_eq!(info.name, DEFAULT_CAMERA_NAME);
        assert_eq!(info.location, [3.0, 1.0, 2.0]);
    }

    #[test]
    fn test_missing_camera_discards_when_creation_disabled() {
        // Arrange
        let (sink, mut queue) = transform_channel();
        let mut applier = SceneApplier::new(Scene::new(), false);
        sink.apply(pose(1.0, 0.0)).unwrap();

        // Act
        let report = applier.apply_pending(&mut queue);

        // Assert
        assert_eq!(report, TickReport { applied: 0, discarded: 1 });
        assert!(applier.scene().camera().is_none());
    }

    #[test]
    fn test_empty_tick_reports_nothing() {
        let (_sink, mut queue) = transform_channel();
        let mut applier = SceneApplier::new(Scene::with_camera(Camera::new("Main")), false);

        assert_eq!(applier.apply_pending(&mut queue), TickReport::default());
        assert_eq!(applier.scene().revision(), 0);
    }

    #[test]
    fn test_direct_apply_without_camera_is_no_camera_error() {
        let mut applier = SceneApplier::new(Scene::new(), false);
        assert_eq!(applier.apply(&pose(1.0, 0.0)), Err(SinkError::NoCamera));
    }
}
