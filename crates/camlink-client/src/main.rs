//! camlink test client entry point.
//!
//! Sends camera transforms to a camlink server: a single pose, the fixed
//! eight-pose test sequence, or an animated orbit.
//!
//! # Usage
//!
//! ```text
//! camlink-client [--host <HOST>] [--port <PORT>] <COMMAND>
//!
//! Commands:
//!   send      Send one pose
//!   sequence  Send the eight-pose test sequence
//!   animate   Stream an orbit animation
//! ```

use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use camlink_client::application::{run_animation, run_sequence};
use camlink_client::domain::test_sequence;
use camlink_client::infrastructure::TransformSender;
use camlink_core::TransformMessage;

// ── CLI argument definitions ──────────────────────────────────────────────────

#[derive(Debug, Parser)]
#[command(
    name = "camlink-client",
    about = "Sends test camera transforms to a camlink server",
    version
)]
struct Cli {
    /// Server host name or IP address.
    #[arg(long, default_value = "localhost", env = "CAMLINK_CONNECT_HOST")]
    host: String,

    /// Server port.
    #[arg(long, default_value_t = 8765, env = "CAMLINK_PORT")]
    port: u16,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Send one pose and disconnect.  Rotations are in radians.
    #[command(allow_negative_numbers = true)]
    Send {
        #[arg(long, default_value_t = 0.0)]
        x: f64,
        #[arg(long, default_value_t = 0.0)]
        y: f64,
        #[arg(long, default_value_t = 0.0)]
        z: f64,
        #[arg(long, default_value_t = 0.0)]
        rot_x: f64,
        #[arg(long, default_value_t = 0.0)]
        rot_y: f64,
        #[arg(long, default_value_t = 0.0)]
        rot_z: f64,
    },

    /// Send the eight-pose test sequence.
    Sequence {
        /// Pause between poses, in milliseconds.
        #[arg(long, default_value_t = 1000)]
        delay_ms: u64,
    },

    /// Stream one lap of an orbit around the origin.
    Animate {
        /// Length of the animation in seconds.
        #[arg(long, default_value_t = 10.0)]
        duration: f64,

        /// Frames per second.
        #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u32).range(1..=240))]
        fps: u32,
    },
}

impl Command {
    async fn run(self, sender: &mut TransformSender) -> anyhow::Result<()> {
        match self {
            Command::Send {
                x,
                y,
                z,
                rot_x,
                rot_y,
                rot_z,
            } => {
                let pose = TransformMessage::new([x, y, z], [rot_x, rot_y, rot_z]);
                sender.send(&pose).await?;
                info!("sent {}", pose.to_json());
            }
            Command::Sequence { delay_ms } => {
                run_sequence(sender, &test_sequence(), Duration::from_millis(delay_ms)).await?;
            }
            Command::Animate { duration, fps } => {
                run_animation(sender, animation_length(duration)?, fps).await?;
            }
        }
        Ok(())
    }
}

/// Converts the `--duration` argument into a [`Duration`].
fn animation_length(seconds: f64) -> anyhow::Result<Duration> {
    Duration::try_from_secs_f64(seconds)
        .with_context(|| format!("--duration {seconds} is not a usable number of seconds"))
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut sender = TransformSender::connect(&cli.host, cli.port)
        .await
        .with_context(|| format!("is a camlink server listening on {}:{}?", cli.host, cli.port))?;

    tokio::select! {
        result = cli.command.run(&mut sender) => result?,
        _ = tokio::signal::ctrl_c() => warn!("interrupted; closing connection"),
    }

    sender.close().await?;
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
