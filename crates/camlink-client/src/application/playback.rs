//! Use cases that pace motion patterns onto a sender.

use std::time::Duration;

use tokio::io::AsyncWrite;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::info;

use camlink_core::TransformMessage;

use crate::domain::motion::{frame_count, orbit_frames};
use crate::infrastructure::sender::{SenderError, TransformSender};

/// Sends each pose in `poses`, waiting `delay` between consecutive poses.
///
/// Returns the number of poses sent.
///
/// # Errors
///
/// Stops at the first failed send and returns its error.
pub async fn run_sequence<W>(
    sender: &mut TransformSender<W>,
    poses: &[TransformMessage],
    delay: Duration,
) -> Result<usize, SenderError>
where
    W: AsyncWrite + Unpin,
{
    for (i, pose) in poses.iter().enumerate() {
        if i > 0 && !delay.is_zero() {
            sleep(delay).await;
        }
        info!(
            "test position {}/{}: location={:?} rotation={:?}",
            i + 1,
            poses.len(),
            pose.location(),
            pose.rotation()
        );
        sender.send(pose).await?;
    }
    info!("test sequence complete");
    Ok(poses.len())
}

/// Streams one lap of the orbit over `duration` at `fps` frames per second.
///
/// Returns the number of frames sent.
///
/// # Errors
///
/// Stops at the first failed send and returns its error.
pub async fn run_animation<W>(
    sender: &mut TransformSender<W>,
    duration: Duration,
    fps: u32,
) -> Result<u64, SenderError>
where
    W: AsyncWrite + Unpin,
{
    let fps = fps.max(1);
    let frames = frame_count(duration, fps);
    info!("starting animated camera motion: {frames} frame(s) over {duration:?} at {fps} fps");

    let mut ticker = interval(Duration::from_secs_f64(1.0 / f64::from(fps)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut sent = 0;
    for pose in orbit_frames(frames) {
        ticker.tick().await;
        sender.send(&pose).await?;
        sent += 1;
    }
    info!("animation complete: sent {sent} frame(s)");
    Ok(sent)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::motion::{orbit_pose, test_sequence};
    use camlink_core::{decode_transform, FrameReader, DEFAULT_MAX_FRAME_LEN};
    use tokio::io::DuplexStream;

    async fn read_all(server: DuplexStream) -> Vec<TransformMessage> {
        let mut reader = FrameReader::new(server, DEFAULT_MAX_FRAME_LEN);
        let mut out = Vec::new();
        while let Some(payload) = reader.next_frame().await.unwrap() {
            out.push(decode_transform(&payload).unwrap());
        }
        out
    }

    #[tokio::test]
    async fn test_run_sequence_sends_every_pose_in_order() {
        // Arrange
        let (client, server) = tokio::io::duplex(16 * 1024);
        let mut sender = TransformSender::new(client);
        let poses = test_sequence();

        // Act
        let sent = run_sequence(&mut sender, &poses, Duration::ZERO).await.unwrap();
        sender.close().await.unwrap();

        // Assert
        assert_eq!(sent, 8);
        assert_eq!(read_all(server).await, poses);
    }

    #[tokio::test]
    async fn test_run_animation_sends_frame_count_poses() {
        // Arrange: 100 ms at 50 fps is five frames
        let (client, server) = tokio::io::duplex(16 * 1024);
        let mut sender = TransformSender::new(client);

        // Act
        let sent = run_animation(&mut sender, Duration::from_millis(100), 50).await.unwrap();
        sender.close().await.unwrap();

        // Assert
        let received = read_all(server).await;
        assert_eq!(sent, 5);
        assert_eq!(received.len(), 5);
        assert_eq!(received[0], orbit_pose(0.0));
        assert_eq!(received[4], orbit_pose(0.8));
    }

    #[tokio::test]
    async fn test_run_sequence_stops_on_send_failure() {
        let (client, server) = tokio::io::duplex(64);
        drop(server);
        let mut sender = TransformSender::new(client);

        let result = run_sequence(&mut sender, &test_sequence(), Duration::ZERO).await;

        assert!(result.is_err());
        assert_eq!(sender.frames_sent(), 0);
    }
}
