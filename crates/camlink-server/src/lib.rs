//! camlink-server library crate.
//!
//! Accepts TCP clients that stream camera poses as length-prefixed JSON
//! frames and delivers each decoded transform to a host scene.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! Sender (phone, script, camlink-client)
//!         ↓  [u32 BE length][{"X":..,"Y":..,"Z":..,"ROT_X":..,"ROT_Y":..,"ROT_Z":..}]
//! [camlink-server]
//!   ├── domain/           ServerConfig, SinkMode
//!   ├── application/      TransformSink seam, channel hand-off, SceneApplier
//!   └── infrastructure/
//!         ├── supervisor/   start/stop, accept loop, shutdown drain
//!         ├── connection/   per-client frame loop
//!         └── config_file/  optional TOML config
//!         ↓  TransformQueue, drained once per host tick
//! Host scene camera (camlink-core::Scene)
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O and no async.
//! - `application` depends on `domain` and `camlink-core` only.
//! - `infrastructure` depends on all other layers plus `tokio`.

/// Domain layer: configuration types.
pub mod domain;

/// Application layer: transform sinks and scene application.
pub mod application;

/// Infrastructure layer: listener supervisor, connection handler, config file.
pub mod infrastructure;
