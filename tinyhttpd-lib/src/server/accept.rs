use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::telemetry::metrics::values;
use crate::telemetry::Metrics;

use super::connection::{ConnectionError, ConnectionManager};
use super::handler::ConnectionHandler;

/// Owns the listener until shutdown; dropping it at loop exit closes the socket.
pub(crate) struct AcceptLoop {
    pub(crate) listener: TcpListener,
    pub(crate) tls: Option<TlsAcceptor>,
    pub(crate) manager: ConnectionManager,
    pub(crate) handler: Arc<ConnectionHandler>,
    pub(crate) tracker: TaskTracker,
    pub(crate) shutdown: CancellationToken,
    pub(crate) metrics: Option<Arc<Metrics>>,
}

impl AcceptLoop {
    pub(crate) async fn run(self) {
        loop {
            if self.shutdown.is_cancelled() {
                break;
            }

            let accepted = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                result = self.listener.accept() => result,
            };

            let (stream, peer) = match accepted {
                Ok((stream, peer)) => (stream, peer),
                Err(e) => {
                    if self.shutdown.is_cancelled() {
                        break;
                    }
                    warn!(error = %e, "accept error");
                    if let Some(ref m) = self.metrics {
                        m.record_error(values::ERROR_ACCEPT);
                    }
                    continue;
                }
            };

            let guard = match self.manager.try_accept(peer) {
                Ok(guard) => guard,
                Err(ConnectionError::Shutdown) => {
                    debug!(%peer, "shutdown requested, dropping accepted connection");
                    break;
                }
                Err(ConnectionError::RateLimited { .. }) => {
                    drop(stream);
                    continue;
                }
            };

            let handler = Arc::clone(&self.handler);
            let tls = self.tls.clone();
            self.tracker.spawn(async move {
                let _guard = guard;
                handler.serve(stream, peer, tls).await;
            });
        }

        drop(self.listener);
        info!(in_flight = self.manager.active(), "accept loop stopped, listener closed");
    }
}
