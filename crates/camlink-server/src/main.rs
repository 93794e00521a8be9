//! camlink transform server entry point.
//!
//! Listens for senders streaming camera poses over TCP and applies them to
//! the host scene camera.  Each frame is a 4-byte big-endian length followed
//! by a JSON object with `X`, `Y`, `Z`, `ROT_X`, `ROT_Y`, and `ROT_Z`.
//!
//! # Usage
//!
//! ```text
//! camlink-server [OPTIONS]
//!
//! Options:
//!   --config <PATH>          TOML config file
//!   --host <HOST>            Bind host [default: 0.0.0.0]
//!   --port <PORT>            Bind port [default: 8765]
//!   --max-frame-len <BYTES>  Largest accepted payload [default: 1048576]
//!   --sink <camera|log>      Where transforms go [default: camera]
//!   --tick-ms <MS>           Host loop period [default: 16]
//!   --no-create-camera       Drop transforms when the scene has no camera
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable                | Flag              |
//! |-------------------------|-------------------|
//! | `CAMLINK_CONFIG`        | `--config`        |
//! | `CAMLINK_HOST`          | `--host`          |
//! | `CAMLINK_PORT`          | `--port`          |
//! | `CAMLINK_MAX_FRAME_LEN` | `--max-frame-len` |
//! | `CAMLINK_SINK`          | `--sink`          |
//! | `CAMLINK_TICK_MS`       | `--tick-ms`       |
//!
//! Precedence, highest first: command line, environment, config file,
//! built-in defaults.

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use camlink_core::Scene;
use camlink_server::application::{
    transform_channel, LoggingSink, SceneApplier, TickReport, TransformQueue, TransformSink,
};
use camlink_server::domain::{ServerConfig, SinkMode};
use camlink_server::infrastructure::{load_config_file, FileConfig, ServerSupervisor};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// camlink transform server.
///
/// Receives 6-DoF camera transforms over TCP and drives the scene camera.
#[derive(Debug, Parser)]
#[command(
    name = "camlink-server",
    about = "Streams camera transforms from TCP clients into a host scene",
    version
)]
struct Cli {
    /// TOML config file.  Values given on the command line override it.
    #[arg(long, env = "CAMLINK_CONFIG")]
    config: Option<PathBuf>,

    /// Host or IP address to bind.
    ///
    /// `0.0.0.0` accepts senders on the LAN; `localhost` accepts only local
    /// senders.
    #[arg(long, env = "CAMLINK_HOST")]
    host: Option<String>,

    /// TCP port to listen on.  `0` picks a free port.
    #[arg(long, env = "CAMLINK_PORT")]
    port: Option<u16>,

    /// Largest payload accepted in a single frame, in bytes.
    #[arg(long, env = "CAMLINK_MAX_FRAME_LEN")]
    max_frame_len: Option<usize>,

    /// Where decoded transforms go: `camera` or `log`.
    #[arg(long, env = "CAMLINK_SINK")]
    sink: Option<SinkMode>,

    /// Host loop period in milliseconds.
    #[arg(long, env = "CAMLINK_TICK_MS")]
    tick_ms: Option<u64>,

    /// Do not create a camera when the scene has none.
    #[arg(long)]
    no_create_camera: bool,
}

impl Cli {
    /// Reads the config file named by `--config`, if any.
    fn load_file_config(&self) -> anyhow::Result<Option<FileConfig>> {
        self.config
            .as_deref()
            .map(|path| {
                load_config_file(path)
                    .with_context(|| format!("failed to load config file {}", path.display()))
            })
            .transpose()
    }

    /// Layers the command-line values over `file` (or the defaults).
    ///
    /// # Errors
    ///
    /// Returns an error if the file holds invalid values, or if
    /// `--max-frame-len` or `--tick-ms` is zero.
    fn into_server_config(self, file: Option<&FileConfig>) -> anyhow::Result<ServerConfig> {
        let mut config = match file {
            Some(file) => file.to_server_config()?,
            None => ServerConfig::default(),
        };

        if let Some(host) = self.host {
            config.bind_host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(max_frame_len) = self.max_frame_len {
            anyhow::ensure!(max_frame_len > 0, "--max-frame-len must be greater than zero");
            config.max_frame_len = max_frame_len;
        }
        if let Some(sink) = self.sink {
            config.sink_mode = sink;
        }
        if let Some(tick_ms) = self.tick_ms {
            anyhow::ensure!(tick_ms > 0, "--tick-ms must be greater than zero");
            config.tick_interval = Duration::from_millis(tick_ms);
        }
        if self.no_create_camera {
            config.create_camera_if_missing = false;
        }

        Ok(config)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

/// Program entry point.
///
/// 1. Parse the CLI and read the optional config file.
/// 2. Initialise `tracing` (`RUST_LOG` wins over the file's `log_level`).
/// 3. Build the sink and start the supervisor.
/// 4. Run the host loop until Ctrl+C, applying queued transforms each tick.
/// 5. Stop the supervisor, which drains open connections, then apply
///    whatever those connections delivered while closing.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let file = cli.load_file_config()?;

    // ── Logging setup ─────────────────────────────────────────────────────────
    let default_level = file
        .as_ref()
        .map(|f| f.log_level.clone())
        .unwrap_or_else(|| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let config = cli.into_server_config(file.as_ref())?;
    info!(
        "camlink server starting: bind={}:{}, sink={}, max_frame_len={}",
        config.bind_host, config.port, config.sink_mode, config.max_frame_len
    );

    // ── Sink ──────────────────────────────────────────────────────────────────
    let (sink, mut queue): (Arc<dyn TransformSink>, Option<TransformQueue>) = match config.sink_mode {
        SinkMode::Camera => {
            let (sink, queue) = transform_channel();
            (Arc::new(sink) as Arc<dyn TransformSink>, Some(queue))
        }
        SinkMode::Log => (Arc::new(LoggingSink) as Arc<dyn TransformSink>, None),
    };

    let supervisor = ServerSupervisor::new(sink, &config);
    let local_addr = supervisor
        .start(&config.bind_host, config.port)
        .await
        .context("failed to start transform server")?;
    info!("send transforms to {local_addr}");

    // ── Graceful shutdown flag ────────────────────────────────────────────────
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C; shutting down");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => tracing::error!("failed to listen for Ctrl+C signal: {e}"),
        }
    });

    let mut applier = SceneApplier::new(Scene::new(), config.create_camera_if_missing);
    run_host_loop(&mut applier, queue.as_mut(), &config, &running).await;

    // The queue outlives the supervisor so closing connections never see
    // a disconnected sink.
    supervisor.stop().await;
    finish_host(applier, queue);
    info!("camlink server stopped");
    Ok(())
}

/// Applies queued transforms to the scene once per tick until `running`
/// is cleared.
async fn run_host_loop(
    applier: &mut SceneApplier,
    mut queue: Option<&mut TransformQueue>,
    config: &ServerConfig,
    running: &AtomicBool,
) {
    let mut ticker = interval(config.tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    while running.load(Ordering::Relaxed) {
        ticker.tick().await;
        if let Some(queue) = queue.as_deref_mut() {
            let report = applier.apply_pending(queue);
            if report.discarded > 0 && !config.create_camera_if_missing {
                warn!("{} transform(s) dropped: scene has no camera", report.discarded);
            }
        }
    }
}

/// Applies transforms queued after the host loop ended and logs the final
/// camera pose.
fn finish_host(mut applier: SceneApplier, queue: Option<TransformQueue>) -> TickReport {
    let report = match queue {
        Some(mut queue) => applier.apply_pending(&mut queue),
        None => TickReport::default(),
    };
    if report.applied > 0 {
        debug!("applied {} transform(s) received during shutdown", report.applied);
    }

    if let Some(info) = applier.camera_info() {
        info!(
            "final camera '{}' pose: location={:?} rotation(deg)={:?}",
            info.name, info.location, info.rotation_degrees
        );
    }
    report
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use camlink_core::TransformMessage;

    #[tokio::test]
    async fn test_queue_stays_connected_until_host_finishes() {
        // Arrange: a host loop that has already been told to stop
        let (sink, mut queue) = transform_channel();
        let mut applier = SceneApplier::new(Scene::new(), true);
        let running = AtomicBool::new(false);
        run_host_loop(&mut applier, Some(&mut queue), &ServerConfig::default(), &running).await;

        // Act: a connection delivers while the supervisor is stopping
        let late = TransformMessage::new([1.0, 2.0, 3.0], [0.0; 3]);
        let delivered = sink.apply(late);
        let report = finish_host(applier, Some(queue));

        // Assert
        assert_eq!(delivered, Ok(()));
        assert_eq!(report, TickReport { applied: 1, discarded: 0 });
    }

    #[test]
    fn test_cli_without_arguments_yields_default_config() {
        // Arrange: parse with no arguments (all defaults apply)
        let cli = Cli::parse_from(["camlink-server"]);

        // Act
        let config = cli.into_server_config(None).unwrap();

        // Assert
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn test_cli_port_override() {
        let cli = Cli::parse_from(["camlink-server", "--port", "9999"]);
        let config = cli.into_server_config(None).unwrap();
        assert_eq!(config.port, 9999);
    }

    #[test]
    fn test_cli_host_override() {
        let cli = Cli::parse_from(["camlink-server", "--host", "localhost"]);
        let config = cli.into_server_config(None).unwrap();
        assert_eq!(config.bind_host, "localhost");
    }

    #[test]
    fn test_cli_sink_override() {
        let cli = Cli::parse_from(["camlink-server", "--sink", "log"]);
        let config = cli.into_server_config(None).unwrap();
        assert_eq!(config.sink_mode, SinkMode::Log);
    }

    #[test]
    fn test_cli_rejects_unknown_sink() {
        let result = Cli::try_parse_from(["camlink-server", "--sink", "viewport"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_tick_ms_override() {
        let cli = Cli::parse_from(["camlink-server", "--tick-ms", "33"]);
        let config = cli.into_server_config(None).unwrap();
        assert_eq!(config.tick_interval, Duration::from_millis(33));
    }

    #[test]
    fn test_cli_zero_tick_ms_is_error() {
        let cli = Cli::parse_from(["camlink-server", "--tick-ms", "0"]);
        assert!(cli.into_server_config(None).is_err());
    }

    #[test]
    fn test_cli_zero_max_frame_len_is_error() {
        let cli = Cli::parse_from(["camlink-server", "--max-frame-len", "0"]);
        assert!(cli.into_server_config(None).is_err());
    }

    #[test]
    fn test_cli_no_create_camera_flag() {
        let cli = Cli::parse_from(["camlink-server", "--no-create-camera"]);
        let config = cli.into_server_config(None).unwrap();
        assert!(!config.create_camera_if_missing);
    }

    #[test]
    fn test_cli_overrides_file_values() {
        // Arrange: the file sets port and host, the CLI only overrides the port
        let file = FileConfig::from_toml_str(
            "[server]\nbind_host = \"127.0.0.1\"\nport = 7000\n",
        )
        .unwrap();
        let cli = Cli::parse_from(["camlink-server", "--port", "7100"]);

        // Act
        let config = cli.into_server_config(Some(&file)).unwrap();

        // Assert
        assert_eq!(config.port, 7100);
        assert_eq!(config.bind_host, "127.0.0.1");
    }

    #[test]
    fn test_missing_config_file_is_error() {
        let cli = Cli::parse_from(["camlink-server", "--config", "/nonexistent/camlink.toml"]);
        assert!(cli.load_file_config().is_err());
    }

    #[test]
    fn test_no_config_flag_loads_nothing() {
        let cli = Cli {
            config: None,
            host: None,
            port: None,
            max_frame_len: None,
            sink: None,
            tick_ms: None,
            no_create_camera: false,
        };
        assert!(cli.load_file_config().unwrap().is_none());
    }
}
