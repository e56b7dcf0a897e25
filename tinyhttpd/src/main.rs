#![forbid(unsafe_code)]

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tinyhttpd_lib::config::{parse_from_path, validate_config, Config, TlsConfig};
use tinyhttpd_lib::telemetry::{
    bind_observability_server, init_metrics, init_tracing, serve_observability,
};
use tinyhttpd_lib::{Result, Server, ServerError, ShutdownSignal};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about = "Minimal static file server with per-client rate limiting")]
struct Cli {
    /// Path to a TOML configuration file; flags below override its values
    #[arg(short, long, value_name = "FILE", env = "TINYHTTPD_CONFIG")]
    config: Option<PathBuf>,

    /// The directory to serve files from
    #[arg(long, value_name = "DIR", env = "TINYHTTPD_DIR")]
    dir: Option<PathBuf>,

    /// The port to serve HTTP on
    #[arg(long, env = "TINYHTTPD_PORT")]
    port: Option<u16>,

    /// Serve HTTPS using --cert and --key
    #[arg(long)]
    https: bool,

    /// The certificate file (PEM)
    #[arg(long, value_name = "FILE")]
    cert: Option<String>,

    /// The private key file (PEM)
    #[arg(long, value_name = "FILE")]
    key: Option<String>,

    /// The maximum number of connections per second per client IP
    #[arg(long, value_name = "N")]
    max: Option<u32>,

    /// Serve /metrics and /health on this port
    #[arg(long, value_name = "PORT")]
    metrics_port: Option<u16>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match build_config(&cli) {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("failed to load configuration: {err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = init_tracing(&config.logging) {
        eprintln!("failed to initialize logging: {err}");
        std::process::exit(1);
    }
    info!(?config, "configuration loaded");

    match run(Arc::new(config)).await {
        Ok(()) => info!("Server stopped gracefully"),
        Err(err @ ServerError::ShutdownTimeout { .. }) => {
            error!(%err, "Server failed to stop gracefully");
            std::process::exit(1);
        }
        Err(err) => {
            error!(%err, "server exited with error");
            std::process::exit(1);
        }
    }
}

async fn run(config: Arc<Config>) -> Result<()> {
    let signal = ShutdownSignal::install()?;
    let mut server = Server::bind(Arc::clone(&config)).await?;

    let observability = match config.telemetry.metrics_port {
        Some(port) => {
            let (metrics, registry) = init_metrics()?;
            server = server.with_metrics(metrics);
            Some((bind_observability_server(port).await?, registry))
        }
        None => None,
    };

    let handle = server.start();
    if let Some((listener, registry)) = observability {
        tokio::spawn(serve_observability(listener, registry, handle.shutdown_token()));
    }

    signal.recv().await;
    handle.stop().await
}

fn build_config(cli: &Cli) -> Result<Config> {
    let mut cfg = match &cli.config {
        Some(path) => parse_from_path(path)?,
        None => Config::default(),
    };

    if let Some(dir) = &cli.dir {
        cfg.root = dir.clone();
    }
    if let Some(port) = cli.port {
        cfg.port = port;
    }
    if let Some(max) = cli.max {
        cfg.security.rate_limit.max_requests_per_second = max;
    }
    if let Some(port) = cli.metrics_port {
        cfg.telemetry.metrics_port = Some(port);
    }

    if cli.https {
        let current = cfg.tls.take();
        let cert_path = cli.cert.clone().or_else(|| current.as_ref().map(|t| t.cert_path.clone()));
        let key_path = cli.key.clone().or_else(|| current.as_ref().map(|t| t.key_path.clone()));
        match (cert_path, key_path) {
            (Some(cert_path), Some(key_path)) => cfg.tls = Some(TlsConfig { cert_path, key_path }),
            _ => {
                return Err(ServerError::Config(
                    "--https requires both --cert and --key".to_string(),
                ))
            }
        }
    }

    validate_config(&cfg)?;
    Ok(cfg)
}
