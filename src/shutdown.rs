// src/shutdown.rs
//! Process stop signals.

use std::future::Future;

use anyhow::{Context, Result};
use tracing::info;

/// Install the stop handlers and return a future that resolves on the first
/// Ctrl-C or SIGTERM. Handlers are live once this returns, so a signal that
/// arrives before the future is polled still counts.
#[cfg(unix)]
pub fn shutdown_signal() -> Result<impl Future<Output = Result<()>>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt()).context("installing SIGINT handler")?;
    let mut terminate = signal(SignalKind::terminate()).context("installing SIGTERM handler")?;
    Ok(async move {
        tokio::select! {
            _ = interrupt.recv() => info!("SIGINT received"),
            _ = terminate.recv() => info!("SIGTERM received"),
        }
        Ok(())
    })
}

#[cfg(not(unix))]
pub fn shutdown_signal() -> Result<impl Future<Output = Result<()>>> {
    Ok(async {
        tokio::signal::ctrl_c().await.context("waiting for Ctrl-C")?;
        info!("Ctrl-C received");
        Ok(())
    })
}
