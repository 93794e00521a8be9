//! Protocol module containing the frame codec and the transform message.

pub mod codec;
pub mod messages;

pub use codec::{decode_frame, encode_frame, write_frame, FrameError, FrameReader};
pub use messages::{decode_transform, DecodeError, TransformMessage};
