//! # camlink-core
//!
//! Shared library for camlink containing the wire codec, the transform
//! message decoder, and the camera domain model.
//!
//! This crate is used by both the server and the client.  It opens no
//! sockets; the codec works over any `tokio::io` stream.
//!
//! # Architecture overview
//!
//! camlink streams 6-DoF camera poses from a remote sender (a phone, a
//! tracker, a test script) into a host application over TCP.  Each pose is
//! one JSON object inside one length-prefixed frame.
//!
//! - **`protocol`** – How bytes travel over the network.  A 4-byte
//!   big-endian length prefix followed by a UTF-8 JSON payload, and the
//!   ordered validation that turns that payload into a [`TransformMessage`].
//!
//! - **`domain`** – The [`Scene`] and its single active [`Camera`], which
//!   hosts update from decoded transforms.

pub mod domain;
pub mod protocol;

pub use domain::camera::{Camera, CameraInfo, Scene, SceneError};
pub use protocol::codec::{
    decode_frame, encode_frame, write_frame, FrameError, FrameReader, DEFAULT_MAX_FRAME_LEN,
};
pub use protocol::messages::{decode_transform, DecodeError, TransformMessage, TRANSFORM_FIELDS};
