use std::fs;
use std::path::Path;

use crate::config::Config;
use crate::error::{Result, ServerError};

/// Read, parse and validate a TOML config file.
pub fn load_from_path<P: AsRef<Path>>(p: P) -> Result<Config> {
    let cfg = parse_from_path(p)?;
    validate_config(&cfg)?;
    Ok(cfg)
}

/// Read and parse a TOML config file without validating it.
///
/// Callers that layer overrides on top run [`validate_config`] on the result.
pub fn parse_from_path<P: AsRef<Path>>(p: P) -> Result<Config> {
    let txt = fs::read_to_string(p)
        .map_err(|e| ServerError::Config(format!("Failed to read config file: {e}")))?;
    toml::from_str(&txt).map_err(|e| ServerError::Config(format!("Failed to parse config: {e}")))
}

pub fn validate_config(cfg: &Config) -> Result<()> {
    if !cfg.root.is_dir() {
        return Err(ServerError::Config(format!(
            "Root directory not found: {}",
            cfg.root.display()
        )));
    }

    if let Some(tls) = &cfg.tls {
        if !Path::new(&tls.cert_path).exists() {
            return Err(ServerError::Config(format!(
                "Certificate file not found: {}",
                tls.cert_path
            )));
        }
        if !Path::new(&tls.key_path).exists() {
            return Err(ServerError::Config(format!("Key file not found: {}", tls.key_path)));
        }
    }

    if cfg.security.rate_limit.window_ms == 0 {
        return Err(ServerError::Config("rate_limit.window_ms must be > 0".into()));
    }
    if cfg.security.rate_limit.sweep_interval_secs == 0 {
        return Err(ServerError::Config("rate_limit.sweep_interval_secs must be > 0".into()));
    }
    if cfg.timeout.shutdown_secs == 0 {
        return Err(ServerError::Config("timeout.shutdown_secs must be > 0".into()));
    }
    if cfg.timeout.read_ms == Some(0) {
        return Err(ServerError::Config("timeout.read_ms must be > 0 when set".into()));
    }

    Ok(())
}
