//! Server supervisor: listener lifecycle, accept loop, and shutdown.
//!
//! [`ServerSupervisor`] owns at most one running listener.  `start` binds
//! and spawns the accept loop; `stop` signals shutdown, waits for the loop
//! and its connection tasks to wind down, and returns once the port is
//! released.
//!
//! # Shutdown sequence
//!
//! 1. `stop` flips the shared `watch` flag to `true`.
//! 2. The accept loop leaves its `select!`, drops the listener (no new
//!    connections), and waits up to `shutdown_grace` for open connections.
//! 3. Every connection task sees the same flag and returns at its next
//!    frame boundary or immediately if idle.
//! 4. Tasks still running after the grace period are detached and left
//!    to finish on their own; `stop` does not wait for them.
//!
//! Dropping a running supervisor drops the flag's sender, which connection
//! tasks and the accept loop treat as a shutdown request as well.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{watch, Mutex};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

use crate::application::sink::TransformSink;
use crate::domain::config::ServerConfig;
use crate::infrastructure::connection::{handle_connection, shutdown_requested, ConnectionSummary};

/// Extra time `stop` allows the accept loop beyond the connection grace
/// period before abandoning it.
const ACCEPT_LOOP_JOIN_SLACK: Duration = Duration::from_millis(500);

/// Pause after a failed `accept` before trying again.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Lifecycle state reported by [`ServerSupervisor::state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ServerState {
    Stopped = 0,
    Starting = 1,
    Running = 2,
    Stopping = 3,
}

impl ServerState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => ServerState::Starting,
            2 => ServerState::Running,
            3 => ServerState::Stopping,
            _ => ServerState::Stopped,
        }
    }
}

/// Errors returned by [`ServerSupervisor::start`].
#[derive(Debug, Error)]
pub enum StartError {
    /// A listener is already running; the existing one is left untouched.
    #[error("server is already running on {local_addr}")]
    AlreadyRunning { local_addr: SocketAddr },

    /// The address could not be resolved or bound (in use, no permission,
    /// unknown host name).
    #[error("failed to bind transform server on {addr}: {source}")]
    BindError {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

/// Settings the supervisor copies out of [`ServerConfig`].
#[derive(Debug, Clone, Copy)]
struct ListenerOptions {
    max_frame_len: usize,
    shutdown_grace: Duration,
}

/// Handles of a running listener, present only between `start` and `stop`.
struct RunningServer {
    local_addr: SocketAddr,
    shutdown_tx: watch::Sender<bool>,
    accept_task: JoinHandle<()>,
}

/// Starts and stops the transform listener.
///
/// All lifecycle transitions happen under one async mutex, so concurrent
/// `start`/`stop` calls are serialized.  [`state`](Self::state) can be read
/// at any time without waiting for that lock.
pub struct ServerSupervisor {
    sink: Arc<dyn TransformSink>,
    options: ListenerOptions,
    state: AtomicU8,
    lifecycle: Mutex<Option<RunningServer>>,
}

impl ServerSupervisor {
    /// Creates a stopped supervisor that will deliver transforms to `sink`.
    pub fn new(sink: Arc<dyn TransformSink>, config: &ServerConfig) -> Self {
        Self {
            sink,
            options: ListenerOptions {
                max_frame_len: config.max_frame_len,
                shutdown_grace: config.shutdown_grace,
            },
            state: AtomicU8::new(ServerState::Stopped as u8),
            lifecycle: Mutex::new(None),
        }
    }

    /// Binds `host:port` and starts accepting clients.
    ///
    /// `host` may be an IP address or a host name such as `localhost`.  Port
    /// `0` binds an OS-assigned port; the returned address reports it.
    ///
    /// # Errors
    ///
    /// - [`StartError::AlreadyRunning`] if a listener is already active.  The
    ///   running listener is not affected.
    /// - [`StartError::BindError`] if the address cannot be bound.  The
    ///   supervisor stays stopped.
    pub async fn start(&self, host: &str, port: u16) -> Result<SocketAddr, StartError> {
        let mut lifecycle = self.lifecycle.lock().await;
        if let Some(running) = lifecycle.as_ref() {
            warn!("transform server is already running on {}", running.local_addr);
            return Err(StartError::AlreadyRunning {
                local_addr: running.local_addr,
            });
        }

        self.set_state(ServerState::Starting);
        let bound = match TcpListener::bind((host, port)).await {
            Ok(listener) => listener.local_addr().map(|addr| (listener, addr)),
            Err(e) => Err(e),
        };
        let (listener, local_addr) = match bound {
            Ok(bound) => bound,
            Err(source) => {
                self.set_state(ServerState::Stopped);
                error!("failed to bind transform server on {host}:{port}: {source}");
                return Err(StartError::BindError {
                    addr: format!("{host}:{port}"),
                    source,
                });
            }
        };

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let accept_task = tokio::spawn(accept_loop(
            listener,
            Arc::clone(&self.sink),
            self.options,
            shutdown_rx,
        ));

        *lifecycle = Some(RunningServer {
            local_addr,
            shutdown_tx,
            accept_task,
        });
        self.set_state(ServerState::Running);
        info!("transform server listening on {local_addr}");
        Ok(local_addr)
    }

    /// Stops the listener and winds down open connections.
    ///
    /// Returns once the accept loop has exited, or after the grace period
    /// plus a short slack if it has not.  Calling `stop` on a stopped
    /// supervisor does nothing.
    pub async fn stop(&self) {
        let mut lifecycle = self.lifecycle.lock().await;
        let Some(running) = lifecycle.take() else {
            debug!("stop requested but transform server is not running");
            return;
        };

        self.set_state(ServerState::Stopping);
        info!("stopping transform server on {}", running.local_addr);
        // The accept loop holds a receiver until it exits, so this only
        // fails if the loop already ended on its own.
        let _ = running.shutdown_tx.send(true);

        let join_timeout = self.options.shutdown_grace + ACCEPT_LOOP_JOIN_SLACK;
        match timeout(join_timeout, running.accept_task).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("accept loop task failed: {e}"),
            Err(_) => warn!("accept loop did not exit within {join_timeout:?}; abandoning it"),
        }

        self.set_state(ServerState::Stopped);
        info!("transform server on {} stopped", running.local_addr);
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ServerState {
        ServerState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_running(&self) -> bool {
        self.state() == ServerState::Running
    }

    /// Address the listener is bound to, or `None` when stopped.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.lifecycle.lock().await.as_ref().map(|r| r.local_addr)
    }

    fn set_state(&self, state: ServerState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

// ── Accept loop ───────────────────────────────────────────────────────────────

/// Accepts clients until shutdown, then drains their tasks.
///
/// Finished connection tasks are reaped as the loop runs so the set only
/// holds live connections.
async fn accept_loop(
    listener: TcpListener,
    sink: Arc<dyn TransformSink>,
    options: ListenerOptions,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut handlers: JoinSet<ConnectionSummary> = JoinSet::new();

    loop {
        tokio::select! {
            biased;
            _ = shutdown_requested(&mut shutdown) => {
                debug!("accept loop received shutdown signal");
                break;
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, peer_addr)) => {
                    info!("client connected from {peer_addr}");
                    if let Err(e) = stream.set_nodelay(true) {
                        debug!("could not set TCP_NODELAY for {peer_addr}: {e}");
                    }
                    handlers.spawn(handle_connection(
                        stream,
                        peer_addr,
                        Arc::clone(&sink),
                        options.max_frame_len,
                        shutdown.clone(),
                    ));
                }
                Err(e) => {
                    // Transient (e.g. out of file descriptors); keep serving.
                    error!("accept error: {e}");
                    if accept_backoff(&mut shutdown).await {
                        break;
                    }
                }
            },
            Some(joined) = handlers.join_next(), if !handlers.is_empty() => {
                if let Err(e) = joined {
                    if e.is_panic() {
                        error!("connection task panicked: {e}");
                    }
                }
            }
        }
    }

    drop(listener);
    drain_connections(handlers, options.shutdown_grace).await;
}

/// Sleeps for [`ACCEPT_ERROR_BACKOFF`] unless shutdown is requested first.
///
/// Returns `true` when the accept loop should exit.
async fn accept_backoff(shutdown: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        _ = shutdown_requested(shutdown) => true,
        _ = sleep(ACCEPT_ERROR_BACKOFF) => false,
    }
}

/// Waits up to `grace` for connection tasks, then detaches the rest.
async fn drain_connections(mut handlers: JoinSet<ConnectionSummary>, grace: Duration) {
    if handlers.is_empty() {
        return;
    }

    debug!("waiting up to {grace:?} for {} open connection(s)", handlers.len());
    let drained = timeout(grace, async {
        while handlers.join_next().await.is_some() {}
    })
    .await;

    if drained.is_err() {
        warn!(
            "{} connection(s) still open after {grace:?}; abandoning them",
            handlers.len()
        );
        handlers.detach_all();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::sink::MockTransformSink;

    fn supervisor() -> ServerSupervisor {
        let config = ServerConfig {
            shutdown_grace: Duration::from_millis(200),
            ..ServerConfig::default()
        };
        ServerSupervisor::new(Arc::new(MockTransformSink::new()), &config)
    }

    #[tokio::test]
    async fn test_accept_backoff_waits_before_retrying() {
        // Arrange
        let (_tx, mut rx) = watch::channel(false);
        let started = tokio::time::Instant::now();

        // Act
        let exit = accept_backoff(&mut rx).await;

        // Assert
        assert!(!exit);
        assert!(started.elapsed() >= ACCEPT_ERROR_BACKOFF);
    }

    #[tokio::test]
    async fn test_accept_backoff_returns_early_on_shutdown() {
        let (tx, mut rx) = watch::channel(false);
        tx.send(true).unwrap();

        let exit = timeout(Duration::from_millis(50), accept_backoff(&mut rx))
            .await
            .expect("backoff must not sleep once shutdown is requested");

        assert!(exit);
    }

    #[test]
    fn test_state_round_trips_through_u8() {
        for state in [
            ServerState::Stopped,
            ServerState::Starting,
            ServerState::Running,
            ServerState::Stopping,
        ] {
            assert_eq!(ServerState::from_u8(state as u8), state);
        }
    }

    #[test]
    fn test_new_supervisor_is_stopped() {
        assert_eq!(supervisor().state(), ServerState::Stopped);
    }

    #[tokio::test]
    async fn test_start_then_stop_transitions_state() {
        // Arrange
        let sup = supervisor();

        // Act
        let addr = sup.start("127.0.0.1", 0).await.unwrap();

        // Assert
        assert_ne!(addr.port(), 0);
        assert!(sup.is_running());
        assert_eq!(sup.local_addr().await, Some(addr));

        sup.stop().await;
        assert_eq!(sup.state(), ServerState::Stopped);
        assert_eq!(sup.local_addr().await, None);
    }

    #[tokio::test]
    async fn test_stop_when_stopped_is_noop() {
        let sup = supervisor();
        sup.stop().await;
        sup.stop().await;
        assert_eq!(sup.state(), ServerState::Stopped);
    }

    #[tokio::test]
    async fn test_second_start_reports_already_running() {
        let sup = supervisor();
        let addr = sup.start("127.0.0.1", 0).await.unwrap();

        let err = sup.start("127.0.0.1", 0).await.unwrap_err();

        assert!(matches!(err, StartError::AlreadyRunning { local_addr } if local_addr == addr));
        assert!(sup.is_running());
        sup.stop().await;
    }

    #[tokio::test]
    async fn test_port_in_use_is_bind_error_and_stays_stopped() {
        // Arrange: hold the port with a plain listener
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = taken.local_addr().unwrap().port();
        let sup = supervisor();

        // Act
        let err = sup.start("127.0.0.1", port).await.unwrap_err();

        // Assert
        assert!(matches!(err, StartError::BindError { .. }));
        assert_eq!(sup.state(), ServerState::Stopped);
    }

    #[tokio::test]
    async fn test_restart_after_stop_succeeds() {
        let sup = supervisor();
        sup.start("127.0.0.1", 0).await.unwrap();
        sup.stop().await;

        let again = sup.start("127.0.0.1", 0).await;

        assert!(again.is_ok());
        sup.stop().await;
    }
}
