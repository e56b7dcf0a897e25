//! Per-client admission control.
//!
//! The server consults a single [`RateLimiter`] for every accepted connection,
//! keyed by the client IP derived with [`client_ip`]. Rejected connections are
//! closed before a single byte is read.
//!
//! # Configuration
//!
//! ```toml
//! [security.rate_limit]
//! max_requests_per_second = 10
//! window_ms = 1000
//! sweep_interval_secs = 60
//! ```

mod limiter;

pub use limiter::{RateLimitResult, RateLimiter};

use std::net::SocketAddr;

/// Strip the port from a socket address string.
///
/// Accepts `1.2.3.4:80`, `[::1]:80` and `host:80`. Anything that cannot be split
/// yields the empty string, which the limiter treats as one more client key.
pub fn client_ip(addr: &str) -> String {
    if let Ok(sock) = addr.parse::<SocketAddr>() {
        return sock.ip().to_string();
    }

    match addr.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => {
            if host.contains(':') {
                return String::new();
            }
            host.trim_start_matches('[').trim_end_matches(']').to_string()
        }
        _ => String::new(),
    }
}
