use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::TlsAcceptor;
use tracing::{debug, info, warn};

use crate::http::request::METHOD_GET;
use crate::http::{Request, Response, Router, MAX_REQUEST_BYTES};
use crate::telemetry::metrics::values;
use crate::telemetry::Metrics;

/// Serves exactly one request per connection, then closes it
pub struct ConnectionHandler {
    router: Router,
    read_timeout: Option<Duration>,
    metrics: Option<Arc<Metrics>>,
}

impl ConnectionHandler {
    pub fn new(router: Router, read_timeout: Option<Duration>, metrics: Option<Arc<Metrics>>) -> Self {
        Self { router, read_timeout, metrics }
    }

    /// Entry point for an admitted socket: TLS handshake first when configured.
    pub async fn serve(&self, stream: TcpStream, peer: SocketAddr, tls: Option<TlsAcceptor>) {
        let Some(acceptor) = tls else {
            self.handle(stream, peer).await;
            return;
        };

        match self.bounded(acceptor.accept(stream)).await {
            Ok(tls_stream) => self.handle(tls_stream, peer).await,
            Err(e) => {
                warn!(%peer, error = %e, "tls accept error");
                self.record_error(values::ERROR_TLS_HANDSHAKE);
            }
        }
    }

    /// Read once, answer once, close.
    pub async fn handle<S>(&self, mut stream: S, peer: SocketAddr)
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        debug!(%peer, "serving new connection");

        let mut buf = vec![0u8; MAX_REQUEST_BYTES];
        let n = match self.bounded(stream.read(&mut buf)).await {
            Ok(0) => {
                debug!(%peer, "client closed before sending a request");
                return;
            }
            Ok(n) => n,
            Err(e) => {
                warn!(%peer, error = %e, "error reading request");
                self.record_error(values::ERROR_READ);
                return;
            }
        };

        let text = String::from_utf8_lossy(&buf[..n]);
        let response = match Request::parse(&text) {
            Ok(request) => {
                debug!(%peer, path = request.line.path, "request");
                self.router.respond(&request).await
            }
            Err(e) if e.is_silent() => {
                info!(%peer, error = %e, "unsupported request, closing without response");
                if let Some(ref m) = self.metrics {
                    m.record_unsupported();
                }
                close(&mut stream, peer).await;
                return;
            }
            Err(e) => {
                warn!(%peer, error = %e, "invalid request");
                Response::bad_request()
            }
        };

        match response.write_to(&mut stream).await {
            Ok(written) => {
                if let Some(ref m) = self.metrics {
                    m.record_response(
                        METHOD_GET,
                        response.status.code(),
                        written,
                        response.is_compressed(),
                    );
                }
            }
            Err(e) => {
                warn!(%peer, error = %e, "error writing response");
                self.record_error(values::ERROR_WRITE);
            }
        }

        close(&mut stream, peer).await;
    }

    async fn bounded<F, T>(&self, fut: F) -> io::Result<T>
    where
        F: std::future::Future<Output = io::Result<T>>,
    {
        match self.read_timeout {
            Some(limit) => timeout(limit, fut).await.map_err(|_| {
                io::Error::new(io::ErrorKind::TimedOut, format!("no data within {limit:?}"))
            })?,
            None => fut.await,
        }
    }

    fn record_error(&self, error_type: &'static str) {
        if let Some(ref m) = self.metrics {
            m.record_error(error_type);
        }
    }
}

async fn close<S: AsyncWrite + Unpin>(stream: &mut S, peer: SocketAddr) {
    if let Err(e) = stream.shutdown().await {
        debug!(%peer, error = %e, "error shutting down connection");
    }
    debug!(%peer, "closing connection");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    fn handler(root: &std::path::Path) -> ConnectionHandler {
        ConnectionHandler::new(Router::new(root), None, None)
    }

    fn peer() -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], 40000))
    }

    async fn exchange(handler: &ConnectionHandler, request: &[u8]) -> io::Result<Vec<u8>> {
        let (mut client, server) = duplex(64 * 1024);
        client.write_all(request).await?;
        handler.handle(server, peer()).await;
        let mut out = Vec::new();
        client.read_to_end(&mut out).await?;
        Ok(out)
    }

    #[tokio::test]
    async fn test_greeting() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let out = exchange(&handler(dir.path()), b"GET /home HTTP/1.1\r\n\r\n").await?;
        assert_eq!(
            String::from_utf8(out)?,
            "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 13\r\n\r\nHello, World!"
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_non_get_gets_no_bytes() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let out = exchange(&handler(dir.path()), b"DELETE /x HTTP/1.1\r\n\r\n").await?;
        assert!(out.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_http_token_is_bad_request() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let out = exchange(&handler(dir.path()), b"GET /index.html\r\n\r\n").await?;
        assert_eq!(String::from_utf8(out)?, "HTTP/1.1 400 Bad Request\r\nContent-Length: 0\r\n\r\n");
        Ok(())
    }

    #[tokio::test]
    async fn test_read_timeout_closes_silently() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let handler =
            ConnectionHandler::new(Router::new(dir.path()), Some(Duration::from_millis(50)), None);
        let (mut client, server) = duplex(1024);

        handler.handle(server, peer()).await;
        let mut out = Vec::new();
        client.read_to_end(&mut out).await?;
        assert!(out.is_empty());
        Ok(())
    }
}
