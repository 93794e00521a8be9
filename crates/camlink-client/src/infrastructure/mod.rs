//! Infrastructure layer for camlink-client: the TCP sender.

pub mod sender;

pub use sender::{SenderError, TransformSender};
