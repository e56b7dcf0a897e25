use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::security::rate_limit::{client_ip, RateLimiter};
use crate::telemetry::metrics::values;
use crate::telemetry::Metrics;

use super::guards::ConnectionGuard;

/// Reasons an accepted socket is closed without being served
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConnectionError {
    #[error("Server is shutting down")]
    Shutdown,
    #[error("Rate limit exceeded for client {ip:?} (limit: {limit}, retry after {reset_after:?})")]
    RateLimited { ip: String, limit: usize, reset_after: Duration },
}

/// Admission control and in-flight accounting for accepted sockets
pub struct ConnectionManager {
    limiter: Arc<RateLimiter>,
    active_connections: Arc<AtomicUsize>,
    shutdown: CancellationToken,
    metrics: Option<Arc<Metrics>>,
}

impl ConnectionManager {
    pub fn new(
        limiter: Arc<RateLimiter>,
        shutdown: CancellationToken,
        metrics: Option<Arc<Metrics>>,
    ) -> Self {
        Self { limiter, active_connections: Arc::new(AtomicUsize::new(0)), shutdown, metrics }
    }

    /// Shared in-flight counter
    pub fn active_connections(&self) -> Arc<AtomicUsize> {
        self.active_connections.clone()
    }

    pub fn active(&self) -> usize {
        self.active_connections.load(Ordering::SeqCst)
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Decide whether a freshly accepted socket from `peer` gets a handler.
    /// Returns Ok(guard) if the connection is admitted.
    pub fn try_accept(&self, peer: SocketAddr) -> Result<ConnectionGuard, ConnectionError> {
        if self.is_shutdown() {
            if let Some(ref m) = self.metrics {
                m.record_rejection(values::REJECT_SHUTDOWN);
            }
            return Err(ConnectionError::Shutdown);
        }

        let ip = client_ip(&peer.to_string());
        let result = self.limiter.check(&ip);
        if let Some(ref m) = self.metrics {
            m.record_rate_limit(result.is_allowed());
        }

        if let Some(reset_after) = result.reset_after() {
            if let Some(ref m) = self.metrics {
                m.record_rejection(values::REJECT_RATE_LIMITED);
            }
            warn!(client = %ip, limit = result.limit(), ?reset_after, "Rate limit exceeded, closing connection");
            return Err(ConnectionError::RateLimited { ip, limit: result.limit(), reset_after });
        }

        Ok(ConnectionGuard::new(self.active_connections.clone(), self.metrics.clone()))
    }
}
