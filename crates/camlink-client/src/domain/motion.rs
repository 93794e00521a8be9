//! Camera motion patterns used to exercise a server.
//!
//! Everything here is pure: poses are computed, never sent.  The
//! application layer paces them onto the wire.

use std::f64::consts::PI;
use std::time::Duration;

use camlink_core::TransformMessage;

/// Radius of the orbit traced by [`orbit_pose`], in scene units.
pub const ORBIT_RADIUS: f64 = 5.0;

/// Height the orbit bobs around.
pub const ORBIT_BASE_HEIGHT: f64 = 2.0;

/// The fixed eight-pose test sequence.
///
/// Origin, one step along each axis, the diagonal, a quarter and a half
/// turn about Z, then back to the origin.  A host camera that ends the
/// sequence at rest on the origin received all eight in order.
pub fn test_sequence() -> Vec<TransformMessage> {
    vec![
        TransformMessage::new([0.0, 0.0, 0.0], [0.0, 0.0, 0.0]),
        TransformMessage::new([5.0, 0.0, 0.0], [0.0, 0.0, 0.0]),
        TransformMessage::new([0.0, 5.0, 0.0], [0.0, 0.0, 0.0]),
        TransformMessage::new([0.0, 0.0, 5.0], [0.0, 0.0, 0.0]),
        TransformMessage::new([5.0, 5.0, 5.0], [0.0, 0.0, 0.0]),
        TransformMessage::new([0.0, 0.0, 0.0], [0.0, 0.0, PI / 2.0]),
        TransformMessage::new([0.0, 0.0, 0.0], [0.0, 0.0, PI]),
        TransformMessage::new([0.0, 0.0, 0.0], [0.0, 0.0, 0.0]),
    ]
}

/// Pose at normalized time `t` on one lap of the orbit.
///
/// `t = 0` and `t = 1` are the same point on the circle.  The camera bobs
/// twice per lap and yaws through one full turn.
pub fn orbit_pose(t: f64) -> TransformMessage {
    let angle = 2.0 * PI * t;
    TransformMessage::new(
        [
            ORBIT_RADIUS * angle.cos(),
            ORBIT_RADIUS * angle.sin(),
            ORBIT_BASE_HEIGHT + (2.0 * angle).sin(),
        ],
        [0.0, 0.0, angle],
    )
}

/// Number of frames an animation of `duration` at `fps` sends.
///
/// Always at least one, so a zero-length animation still sends its start pose.
pub fn frame_count(duration: Duration, fps: u32) -> u64 {
    let frames = (duration.as_secs_f64() * f64::from(fps)).round() as u64;
    frames.max(1)
}

/// The poses of one orbit lap sampled at `frames` evenly spaced times.
pub fn orbit_frames(frames: u64) -> impl Iterator<Item = TransformMessage> {
    (0..frames).map(move |i| orbit_pose(i as f64 / frames as f64))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
