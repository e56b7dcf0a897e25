//! Listener lifecycle: bind, accept with admission control, drain on stop.
//!
//! ```text
//! Created -> Listening -> Accepting -> StopRequested -> Draining -> Stopped
//! ```
//!
//! [`Server::bind`] performs the fatal startup work (TLS material, bind).
//! [`Server::start`] consumes the server, so a stopped instance cannot be restarted,
//! and returns the [`ServerHandle`] used to stop it.

mod accept;
pub mod connection;
pub mod handler;
mod shutdown;
mod signal;

pub use connection::{ConnectionError, ConnectionGuard, ConnectionManager};
pub use handler::ConnectionHandler;
pub use shutdown::ServerHandle;
pub use signal::ShutdownSignal;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::time::{interval_at, MissedTickBehavior};
use tokio_rustls::TlsAcceptor;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Result, ServerError};
use crate::http::Router;
use crate::security::rate_limit::RateLimiter;
use crate::telemetry::Metrics;
use crate::tls::build_rustls;

use accept::AcceptLoop;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ServerState {
    Created,
    Listening,
    Accepting,
    StopRequested,
    Draining,
    Stopped,
}

/// Move the published state forward; earlier states are never restored.
pub(crate) fn advance(state: &watch::Sender<ServerState>, next: ServerState) {
    state.send_if_modified(|current| {
        if *current < next {
            debug!(from = ?*current, to = ?next, "server state change");
            *current = next;
            true
        } else {
            false
        }
    });
}

/// A bound, not yet accepting server
pub struct Server {
    config: Arc<Config>,
    listener: TcpListener,
    local_addr: SocketAddr,
    tls: Option<TlsAcceptor>,
    metrics: Option<Arc<Metrics>>,
    state: Arc<watch::Sender<ServerState>>,
}

impl Server {
    /// Load TLS material (when configured) and bind the listener.
    ///
    /// Both failures are fatal: no connection is ever accepted.
    pub async fn bind(config: Arc<Config>) -> Result<Self> {
        let (state, _) = watch::channel(ServerState::Created);

        let tls = match &config.tls {
            Some(t) => Some(build_rustls(t)?),
            None => None,
        };

        let addr = config.listen_addr();
        info!(%addr, https = tls.is_some(), "starting server");
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        let local_addr = listener.local_addr()?;

        advance(&state, ServerState::Listening);
        info!(%local_addr, root = %config.root.display(), "server is ready to accept connections");

        Ok(Self { config, listener, local_addr, tls, metrics: None, state: Arc::new(state) })
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn is_tls(&self) -> bool {
        self.tls.is_some()
    }

    pub fn state(&self) -> watch::Receiver<ServerState> {
        self.state.subscribe()
    }

    /// Spawn the accept loop and return immediately.
    pub fn start(self) -> ServerHandle {
        let shutdown = CancellationToken::new();
        let tracker = TaskTracker::new();

        let rate_limit = &self.config.security.rate_limit;
        let limiter = Arc::new(RateLimiter::new(rate_limit.max_requests_per_second, rate_limit.window()));
        let manager =
            ConnectionManager::new(Arc::clone(&limiter), shutdown.clone(), self.metrics.clone());
        let active = manager.active_connections();

        let handler = Arc::new(ConnectionHandler::new(
            Router::new(self.config.root.clone()),
            self.config.read_timeout(),
            self.metrics.clone(),
        ));

        tracker.spawn(sweep_idle_clients(
            limiter,
            Duration::from_secs(rate_limit.sweep_interval_secs.max(1)),
            shutdown.clone(),
        ));

        tracker.spawn(
            AcceptLoop {
                listener: self.listener,
                tls: self.tls,
                manager,
                handler,
                tracker: tracker.clone(),
                shutdown: shutdown.clone(),
                metrics: self.metrics,
            }
            .run(),
        );

        advance(&self.state, ServerState::Accepting);

        ServerHandle::new(
            self.local_addr,
            shutdown,
            tracker,
            active,
            self.config.shutdown_timeout(),
            self.state,
        )
    }
}

async fn sweep_idle_clients(limiter: Arc<RateLimiter>, every: Duration, shutdown: CancellationToken) {
    let start = tokio::time::Instant::now() + every;
    let mut ticker = interval_at(start, every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                let evicted = limiter.sweep(Instant::now());
                if evicted > 0 {
                    debug!(evicted, tracked = limiter.tracked_clients(), "evicted idle rate limit windows");
                }
            }
        }
    }
}
