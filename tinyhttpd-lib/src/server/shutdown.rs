use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{info, warn};

use crate::error::{Result, ServerError};

use super::{advance, ServerState};

/// Control handle of a running server.
///
/// Dropping the handle does not stop the server; call [`ServerHandle::stop`].
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown: CancellationToken,
    tracker: TaskTracker,
    active_connections: Arc<AtomicUsize>,
    drain_timeout: Duration,
    state: Arc<watch::Sender<ServerState>>,
}

impl ServerHandle {
    pub(crate) fn new(
        local_addr: SocketAddr,
        shutdown: CancellationToken,
        tracker: TaskTracker,
        active_connections: Arc<AtomicUsize>,
        drain_timeout: Duration,
        state: Arc<watch::Sender<ServerState>>,
    ) -> Self {
        Self { local_addr, shutdown, tracker, active_connections, drain_timeout, state }
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Connections admitted and not yet closed
    pub fn in_flight(&self) -> usize {
        self.active_connections.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> watch::Receiver<ServerState> {
        self.state.subscribe()
    }

    pub fn drain_timeout(&self) -> Duration {
        self.drain_timeout
    }

    /// Token cancelled when stop begins, for tasks that should end with the server
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.child_token()
    }

    /// Stop accepting and wait for in-flight connections, up to the drain deadline.
    ///
    /// Safe to call more than once. On timeout the remaining handlers keep running
    /// in the background; nothing is aborted.
    pub async fn stop(&self) -> Result<()> {
        if !self.shutdown.is_cancelled() {
            info!(in_flight = self.in_flight(), "stop requested");
        }
        self.shutdown.cancel();
        advance(&self.state, ServerState::StopRequested);

        self.tracker.close();
        advance(&self.state, ServerState::Draining);
        info!(
            "Waiting for active connections to finish (timeout: {}s)",
            self.drain_timeout.as_secs_f64()
        );

        match timeout(self.drain_timeout, self.tracker.wait()).await {
            Ok(()) => {
                advance(&self.state, ServerState::Stopped);
                info!("All connections closed, shutdown complete");
                Ok(())
            }
            Err(_) => {
                let active = self.in_flight();
                warn!(active_connections = active, "Shutdown timeout reached, {} connections still active", active);
                Err(ServerError::ShutdownTimeout { active })
            }
        }
    }
}
