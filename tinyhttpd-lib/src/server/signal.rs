use tracing::info;

use crate::error::{Result, ServerError};

/// Process shutdown signals, registered at construction.
///
/// Signals delivered after [`ShutdownSignal::install`] returns are buffered until
/// [`ShutdownSignal::recv`] is awaited, so they never take the default action.
#[cfg(unix)]
pub struct ShutdownSignal {
    sigterm: tokio::signal::unix::Signal,
    sigint: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl ShutdownSignal {
    /// Register SIGTERM and SIGINT handlers. Must run inside a tokio runtime.
    pub fn install() -> Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        let sigterm = signal(SignalKind::terminate()).map_err(|e| {
            ServerError::Io(std::io::Error::other(format!("Failed to setup SIGTERM handler: {e}")))
        })?;
        let sigint = signal(SignalKind::interrupt()).map_err(|e| {
            ServerError::Io(std::io::Error::other(format!("Failed to setup SIGINT handler: {e}")))
        })?;
        Ok(Self { sigterm, sigint })
    }

    /// Wait for SIGTERM or SIGINT, returning the name of the signal received.
    pub async fn recv(mut self) -> &'static str {
        let name = tokio::select! {
            _ = self.sigterm.recv() => "SIGTERM",
            _ = self.sigint.recv() => "SIGINT",
        };
        info!(signal = name, "Received signal, initiating graceful shutdown");
        name
    }
}

#[cfg(not(unix))]
pub struct ShutdownSignal {
    _private: (),
}

#[cfg(not(unix))]
impl ShutdownSignal {
    pub fn install() -> Result<Self> {
        Ok(Self { _private: () })
    }

    pub async fn recv(self) -> &'static str {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl-C, stopping");
        }
        info!(signal = "ctrl-c", "Received signal, initiating graceful shutdown");
        "ctrl-c"
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::process::Command;
    use std::time::Duration;

    #[tokio::test]
    async fn test_sigterm_after_install_is_caught() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let signal = ShutdownSignal::install()?;

        // Delivered before anyone awaits: must be buffered, not fatal.
        let status = Command::new("kill")
            .args(["-TERM", &std::process::id().to_string()])
            .status()?;
        assert!(status.success());

        let name = tokio::time::timeout(Duration::from_secs(5), signal.recv()).await?;
        assert_eq!(name, "SIGTERM");
        Ok(())
    }
}
