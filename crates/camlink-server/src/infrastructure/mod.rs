//! Infrastructure layer for camlink-server.
//!
//! All I/O lives here: binding the listener, accepting clients, reading
//! frames off sockets, and loading the config file.
//!
//! # What does NOT belong here?
//!
//! - Deciding what happens to a transform (application layer)
//! - Frame and payload formats (camlink-core)

pub mod config_file;
pub mod connection;
pub mod supervisor;

pub use config_file::{load_config_file, ConfigError, FileConfig};
pub use connection::{handle_connection, ConnectionEnd, ConnectionSummary};
pub use supervisor::{ServerState, ServerSupervisor, StartError};
