//! Integration tests for the test sender against a real loopback listener.
//!
//! The listener side reads frames with the same [`FrameReader`] the server
//! uses, so these tests pin down that what the client writes is exactly what
//! the server expects to read.

use std::time::Duration;

use camlink_client::application::{run_animation, run_sequence};
use camlink_client::domain::test_sequence;
use camlink_client::infrastructure::TransformSender;
use camlink_core::{decode_transform, FrameReader, TransformMessage, DEFAULT_MAX_FRAME_LEN};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Accepts one connection and decodes every frame until the client closes.
async fn spawn_receiver() -> (u16, JoinHandle<Vec<TransformMessage>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let task = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut reader = FrameReader::new(stream, DEFAULT_MAX_FRAME_LEN);
        let mut received = Vec::new();
        while let Some(payload) = reader.next_frame().await.unwrap() {
            received.push(decode_transform(&payload).unwrap());
        }
        received
    });
    (port, task)
}

#[tokio::test]
async fn test_single_pose_reaches_listener() {
    // Arrange
    let (port, receiver) = spawn_receiver().await;
    let pose = TransformMessage::new([1.0, 2.0, 3.0], [0.5, 1.0, 1.5]);

    // Act
    let mut sender = TransformSender::connect("127.0.0.1", port).await.unwrap();
    sender.send(&pose).await.unwrap();
    sender.close().await.unwrap();

    // Assert
    assert_eq!(receiver.await.unwrap(), vec![pose]);
}

#[tokio::test]
async fn test_sequence_arrives_complete_and_in_order() {
    let (port, receiver) = spawn_receiver().await;

    let mut sender = TransformSender::connect("127.0.0.1", port).await.unwrap();
    assert!(sender.peer_addr().is_some());
    run_sequence(&mut sender, &test_sequence(), Duration::from_millis(1))
        .await
        .unwrap();
    sender.close().await.unwrap();

    assert_eq!(receiver.await.unwrap(), test_sequence());
}

#[tokio::test]
async fn test_short_animation_streams_every_frame() {
    let (port, receiver) = spawn_receiver().await;

    // Every resolved address is tried, so `localhost` reaches the IPv4 listener.
    let mut sender = TransformSender::connect("localhost", port).await.unwrap();
    let sent = run_animation(&mut sender, Duration::from_millis(60), 50).await.unwrap();
    sender.close().await.unwrap();

    assert_eq!(receiver.await.unwrap().len() as u64, sent);
}
