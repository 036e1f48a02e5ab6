//! Run command - host the firewall service until a stop signal arrives.

use std::path::PathBuf;

use anyhow::{Context, Result};
use ltfw_core::{ConfigLoader, FirewallService, Iptables, Reconciler, SocketTable};
use tracing::{info, warn};

pub async fn run(config_path: Option<PathBuf>) -> Result<()> {
    let loader = match config_path {
        Some(path) => ConfigLoader::with_path(path),
        None => ConfigLoader::new(),
    };
    let config = loader.load().await.context("Could not load config file")?;

    warn_if_unprivileged();

    let reconciler = Reconciler::from_config(
        &config,
        SocketTable::new(),
        Iptables::new(config.command_timeout()),
    );
    let mut service = FirewallService::new(reconciler)
        .start()
        .await
        .context("Firewall not ready, exiting")?;

    tokio::select! {
        result = wait_for_stop_signal() => {
            result?;
            info!("Stop signal received");
        }
        result = service.exited() => {
            result.context("Firewall loop crashed")?;
            anyhow::bail!("Firewall loop exited unexpectedly");
        }
    }

    service.stop().await.context("Service did not stop cleanly")?;
    Ok(())
}

#[cfg(unix)]
fn warn_if_unprivileged() {
    if !nix::unistd::geteuid().is_root() {
        warn!("Not running as root: firewall commands will probably fail");
    }
}

#[cfg(not(unix))]
fn warn_if_unprivileged() {}

#[cfg(unix)]
async fn wait_for_stop_signal() -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate =
        signal(SignalKind::terminate()).context("Cannot install SIGTERM handler")?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result.context("Cannot listen for SIGINT")?,
        _ = terminate.recv() => {}
    }
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_stop_signal() -> Result<()> {
    tokio::signal::ctrl_c().await.context("Cannot listen for Ctrl-C")?;
    Ok(())
}
