//! Server configuration types.
//!
//! [`ServerConfig`] is the single source of truth for runtime settings.  It
//! is assembled in `main.rs` from defaults, an optional TOML file, and CLI
//! flags (in increasing order of precedence), then handed to the supervisor
//! and the host loop.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use camlink_core::DEFAULT_MAX_FRAME_LEN;
use serde::Deserialize;

/// TCP port the transform server listens on unless configured otherwise.
pub const DEFAULT_PORT: u16 = 8765;

/// Bind host used when none is configured: all interfaces.
pub const DEFAULT_BIND_HOST: &str = "0.0.0.0";

/// Where decoded transforms go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkMode {
    /// Queue transforms and apply them to the scene camera on each host tick.
    #[default]
    Camera,
    /// Log each transform and apply nothing (headless/standalone mode).
    Log,
}

impl FromStr for SinkMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "camera" => Ok(SinkMode::Camera),
            "log" => Ok(SinkMode::Log),
            other => Err(format!("unknown sink mode '{other}' (expected 'camera' or 'log')")),
        }
    }
}

impl fmt::Display for SinkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkMode::Camera => f.write_str("camera"),
            SinkMode::Log => f.write_str("log"),
        }
    }
}

/// All runtime configuration for the transform server and its host loop.
///
/// # Example
///
/// ```rust
/// use camlink_server::domain::ServerConfig;
///
/// let cfg = ServerConfig::default();
/// assert_eq!(cfg.port, 8765);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Host name or IP to bind.  `0.0.0.0` accepts LAN clients (phones on
    /// the same Wi-Fi); `localhost` restricts to this machine.
    pub bind_host: String,

    /// TCP port to bind.  `0` asks the OS for a free port.
    pub port: u16,

    /// Largest payload accepted in one frame.  A larger length prefix closes
    /// the connection.
    pub max_frame_len: usize,

    /// How long in-flight connections get to wind down after `stop()`
    /// before they are abandoned.
    pub shutdown_grace: Duration,

    /// Period of the host loop that drains queued transforms into the scene.
    pub tick_interval: Duration,

    /// Where decoded transforms are delivered.
    pub sink_mode: SinkMode,

    /// Create a camera at the origin when a transform arrives and the scene
    /// has none.  When `false` such transforms are logged and discarded.
    pub create_camera_if_missing: bool,
}

impl Default for ServerConfig {
    /// | Field                    | Default      |
    /// |--------------------------|--------------|
    /// | bind_host                | `0.0.0.0`    |
    /// | port                     | `8765`       |
    /// | max_frame_len            | 1 MiB        |
    /// | shutdown_grace           | 1 second     |
    /// | tick_interval            | 16 ms        |
    /// | sink_mode                | `camera`     |
    /// | create_camera_if_missing | `true`       |
    fn default() -> Self {
        Self {
            bind_host: DEFAULT_BIND_HOST.to_string(),
            port: DEFAULT_PORT,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            shutdown_grace: Duration::from_secs(1),
            tick_interval: Duration::from_millis(16),
            sink_mode: SinkMode::Camera,
            create_camera_if_missing: true,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
