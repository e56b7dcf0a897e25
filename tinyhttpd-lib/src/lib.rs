#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod http;
pub mod security;
pub mod server;
pub mod telemetry;
pub mod tls;

pub use config::{load_from_path, Config, TlsConfig};
pub use error::{Result, ServerError};
pub use security::rate_limit::{client_ip, RateLimitResult, RateLimiter};
pub use server::{Server, ServerHandle, ServerState, ShutdownSignal};
pub use tls::build_rustls;
