//! Domain layer for camlink-server.
//!
//! Plain configuration types with no I/O.  The infrastructure layer fills
//! them in from the command line and the config file.

pub mod config;

pub use config::{ServerConfig, SinkMode, DEFAULT_BIND_HOST, DEFAULT_PORT};
