//! TOML config file for the transform server.
//!
//! The file is optional and only read when `--config <PATH>` is given.  Every
//! field has a default, so a file only needs the settings it changes:
//!
//! ```toml
//! log_level = "debug"
//!
//! [server]
//! bind_host = "127.0.0.1"
//! port = 8765
//! max_frame_len = 1048576
//! shutdown_grace_ms = 1000
//!
//! [host]
//! sink = "camera"
//! tick_interval_ms = 16
//! create_camera_if_missing = true
//! ```
//!
//! Command-line flags win over values read here.

use std::path::{Path, PathBuf};
use std::time::Duration;

use camlink_core::DEFAULT_MAX_FRAME_LEN;
use serde::Deserialize;
use thiserror::Error;

use crate::domain::config::{ServerConfig, SinkMode, DEFAULT_BIND_HOST, DEFAULT_PORT};

/// Error type for config file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value parsed but is outside its allowed range.
    #[error("invalid config value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level layout of the config file.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// `tracing` filter used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub host: HostSection,
}

/// Listener settings.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_bind_host")]
    pub bind_host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_max_frame_len")]
    pub max_frame_len: usize,
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
}

/// Host-side delivery settings.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct HostSection {
    #[serde(default)]
    pub sink: SinkMode,
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    #[serde(default = "default_true")]
    pub create_camera_if_missing: bool,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_bind_host() -> String {
    DEFAULT_BIND_HOST.to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_max_frame_len() -> usize {
    DEFAULT_MAX_FRAME_LEN
}
fn default_shutdown_grace_ms() -> u64 {
    1000
}
fn default_tick_interval_ms() -> u64 {
    16
}
fn default_true() -> bool {
    true
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind_host: default_bind_host(),
            port: default_port(),
            max_frame_len: default_max_frame_len(),
            shutdown_grace_ms: default_shutdown_grace_ms(),
        }
    }
}

impl Default for HostSection {
    fn default() -> Self {
        Self {
            sink: SinkMode::default(),
            tick_interval_ms: default_tick_interval_ms(),
            create_camera_if_missing: default_true(),
        }
    }
}

impl FileConfig {
    /// Parses a config document from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML or unknown keys.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Builds a [`ServerConfig`] from the file's values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the frame limit or tick
    /// interval is zero.
    pub fn to_server_config(&self) -> Result<ServerConfig, ConfigError> {
        if self.server.max_frame_len == 0 {
            return Err(ConfigError::Invalid {
                field: "server.max_frame_len",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.host.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "host.tick_interval_ms",
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(ServerConfig {
            bind_host: self.server.bind_host.clone(),
            port: self.server.port,
            max_frame_len: self.server.max_frame_len,
            shutdown_grace: Duration::from_millis(self.server.shutdown_grace_ms),
            tick_interval: Duration::from_millis(self.host.tick_interval_ms),
            sink_mode: self.host.sink,
            create_camera_if_missing: self.host.create_camera_if_missing,
        })
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Loads and parses the config file at `path`.
///
/// Unlike an implicit default location, an explicitly named file that does
/// not exist is an error.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file cannot be read and
/// [`ConfigError::Parse`] if its TOML is malformed.
pub fn load_config_file(path: &Path) -> Result<FileConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    FileConfig::from_toml_str(&content)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_matches_server_defaults() {
        // Arrange / Act
        let file = FileConfig::from_toml_str("").unwrap();

        // Assert
        assert_eq!(file.log_level, "info");
        assert_eq!(file.to_server_config().unwrap(), ServerConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults_for_missing_fields() {
        let file = FileConfig::from_toml_str(
            r#"
            [server]
            port = 9000
            "#,
        )
        .unwrap();

        let cfg = file.to_server_config().unwrap();
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.bind_host, "0.0.0.0");
        assert_eq!(cfg.max_frame_len, DEFAULT_MAX_FRAME_LEN);
    }

    #[test]
    fn test_full_file_is_applied() {
        // Arrange
        let text = r#"
            log_level = "debug"

            [server]
            bind_host = "127.0.0.1"
            port = 7000
            max_frame_len = 4096
            shutdown_grace_ms = 250

            [host]
            sink = "log"
            tick_interval_ms = 33
            create_camera_if_missing = false
        "#;

        // Act
        let file = FileConfig::from_toml_str(text).unwrap();
        let cfg = file.to_server_config().unwrap();

        // Assert
        assert_eq!(file.log_level, "debug");
        assert_eq!(cfg.bind_host, "127.0.0.1");
        assert_eq!(cfg.port, 7000);
        assert_eq!(cfg.max_frame_len, 4096);
        assert_eq!(cfg.shutdown_grace, Duration::from_millis(250));
        assert_eq!(cfg.tick_interval, Duration::from_millis(33));
        assert_eq!(cfg.sink_mode, SinkMode::Log);
        assert!(!cfg.create_camera_if_missing);
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let result = FileConfig::from_toml_str(
            r#"
            [server]
            prot = 9000
            "#,
        );
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_unknown_sink_mode_is_rejected() {
        let result = FileConfig::from_toml_str(
            r#"
            [host]
            sink = "viewport"
            "#,
        );
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_zero_frame_limit_is_invalid() {
        let file = FileConfig::from_toml_str("[server]\nmax_frame_len = 0\n").unwrap();
        let err = file.to_server_config().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "server.max_frame_len", .. }));
    }

    #[test]
    fn test_zero_tick_interval_is_invalid() {
        let file = FileConfig::from_toml_str("[host]\ntick_interval_ms = 0\n").unwrap();
        assert!(matches!(
            file.to_server_config(),
            Err(ConfigError::Invalid { field: "host.tick_interval_ms", .. })
        ));
    }

    #[test]
    fn test_missing_file_returns_io_error_with_path() {
        let path = Path::new("/nonexistent/camlink/config.toml");

        let err = load_config_file(path).unwrap_err();

        match err {
            ConfigError::Io { path: reported, .. } => assert_eq!(reported, path),
            other => panic!("expected Io error, got {other:?}"),
        }
    }

    #[test]
    fn test_load_config_file_reads_from_disk() {
        // Arrange
        let path = std::env::temp_dir().join(format!("camlink-config-{}.toml", std::process::id()));
        std::fs::write(&path, "[server]\nport = 8123\n").unwrap();

        // Act
        let result = load_config_file(&path);
        let _ = std::fs::remove_file(&path);

        // Assert
        assert_eq!(result.unwrap().server.port, 8123);
    }
}
