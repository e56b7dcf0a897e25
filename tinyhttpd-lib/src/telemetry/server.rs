use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::Request;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use prometheus::Registry;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::{Result, ServerError};
use crate::telemetry::{handle_metrics, health_check_response};

/// Bind the observability listener
pub async fn bind_observability_server(port: u16) -> Result<TcpListener> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })
}

/// Serve metrics and health checks until `shutdown` fires.
///
/// - `/metrics` - Prometheus metrics
/// - `/health` - 200 while running, 503 once shutdown started
pub async fn serve_observability(
    listener: TcpListener,
    registry: Registry,
    shutdown: CancellationToken,
) {
    let registry = Arc::new(registry);
    if let Ok(addr) = listener.local_addr() {
        info!(?addr, "Observability server started (metrics + health checks)");
    }

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Observability server: shutdown requested");
                break;
            }
            result = listener.accept() => {
                let (stream, peer) = match result {
                    Ok((stream, peer)) => (stream, peer),
                    Err(e) => {
                        warn!(error = %e, "Observability server: accept error");
                        continue;
                    }
                };

                let registry = registry.clone();
                let shutdown = shutdown.clone();
                tokio::spawn(async move {
                    let svc = hyper::service::service_fn(move |req: Request<Incoming>| {
                        let registry = registry.clone();
                        let stopping = shutdown.is_cancelled();
                        async move {
                            let result = match req.uri().path() {
                                "/health" => health_check_response(stopping),
                                "/metrics" => handle_metrics(&registry),
                                _ => return Ok::<_, hyper::Error>(plain(hyper::StatusCode::NOT_FOUND, "Not Found")),
                            };
                            match result {
                                Ok(resp) => Ok(resp),
                                Err(e) => {
                                    warn!(error = %e, "Observability server: handler error");
                                    Ok(plain(hyper::StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error"))
                                }
                            }
                        }
                    });

                    let builder = ConnBuilder::new(TokioExecutor::new());
                    if let Err(e) = builder.serve_connection(TokioIo::new(stream), svc).await {
                        warn!(?peer, error = %e, "Observability server: serve_connection error");
                    }
                });
            }
        }
    }

    info!("Observability server stopped");
}

fn plain(
    status: hyper::StatusCode,
    text: &'static str,
) -> hyper::Response<http_body_util::combinators::BoxBody<Bytes, hyper::Error>> {
    let body = Full::new(Bytes::from(text))
        .map_err(|never| match never {})
        .boxed();
    let mut resp = hyper::Response::new(body);
    *resp.status_mut() = status;
    resp
}
