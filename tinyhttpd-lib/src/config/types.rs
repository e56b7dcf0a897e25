use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// TLS configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TlsConfig {
    /// Path to TLS certificate file (PEM format)
    /// File must exist and be readable at startup
    pub cert_path: String,
    /// Path to TLS private key file (PEM format)
    /// File must exist and be readable at startup
    pub key_path: String,
}

/// Per-client rate limiting configuration
#[derive(Debug, Deserialize, Clone)]
pub struct RateLimitConfig {
    /// Maximum connections admitted per client IP inside one window
    /// Default: 10
    #[serde(default = "default_max_requests_per_second")]
    pub max_requests_per_second: u32,
    /// Sliding window length in milliseconds
    /// Default: 1000
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,
    /// How often idle client windows are evicted from memory, in seconds
    /// Default: 60
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests_per_second: default_max_requests_per_second(),
            window_ms: default_window_ms(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

/// Security configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct SecurityConfig {
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

/// Timeout configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TimeoutConfig {
    /// Graceful shutdown (drain) deadline in seconds
    /// Default: 5
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_secs: u64,
    /// Upper bound for the single request read, in milliseconds
    /// Default: None (wait until the client sends or closes)
    #[serde(default)]
    pub read_ms: Option<u64>,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { shutdown_secs: default_shutdown_timeout(), read_ms: None }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    /// Can be overridden at runtime via RUST_LOG environment variable
    /// Default: "info"
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Show module path (target) in log messages
    /// Default: false
    #[serde(default)]
    pub show_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), show_target: false }
    }
}

/// Telemetry configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct TelemetryConfig {
    /// Metrics server port (optional)
    /// If provided, starts a separate HTTP server on this port for `/metrics` and `/health`
    /// Default: None (metrics disabled)
    #[serde(default)]
    pub metrics_port: Option<u16>,
}

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Directory static files are served from
    /// Default: "."
    #[serde(default = "default_root")]
    pub root: PathBuf,
    /// Address to listen on
    /// Default: 0.0.0.0
    #[serde(default = "default_host")]
    pub host: IpAddr,
    /// Port to listen on, 0 picks an ephemeral port
    /// Default: 8080
    #[serde(default = "default_port")]
    pub port: u16,
    /// TLS configuration (optional)
    /// If not provided, the server speaks plain HTTP
    #[serde(default)]
    pub tls: Option<TlsConfig>,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub timeout: TimeoutConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: default_root(),
            host: default_host(),
            port: default_port(),
            tls: None,
            security: SecurityConfig::default(),
            timeout: TimeoutConfig::default(),
            logging: LoggingConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl Config {
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout.shutdown_secs)
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.timeout.read_ms.map(Duration::from_millis)
    }
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

fn default_max_requests_per_second() -> u32 {
    10
}

fn default_window_ms() -> u64 {
    1000
}

fn default_sweep_interval() -> u64 {
    60
}

fn default_shutdown_timeout() -> u64 {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}
