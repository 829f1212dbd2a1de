//! Systemd service integration
//!
//! sd-notify support for Type=notify units: readiness, status, stop
//! notification, and watchdog keepalives.

use anyhow::{Context, Result};
use std::env;
use std::os::unix::net::UnixDatagram;
use tracing::{debug, error, info};

/// Send one sd-notify state message, if running under systemd
fn notify(state: &str) -> Result<bool> {
    let Ok(socket_path) = env::var("NOTIFY_SOCKET") else {
        debug!("NOTIFY_SOCKET not set, skipping systemd notification");
        return Ok(false);
    };

    let socket = UnixDatagram::unbound().context("Failed to create notify socket")?;
    socket
        .send_to(state.as_bytes(), &socket_path)
        .with_context(|| format!("Failed to send '{}' to systemd", state))?;
    Ok(true)
}

/// Notify systemd that initialization is complete
pub fn notify_ready() -> Result<()> {
    if notify("READY=1")? {
        info!("Notified systemd: service ready");
    }
    Ok(())
}

/// Notify systemd that shutdown has begun
pub fn notify_stopping() -> Result<()> {
    if notify("STOPPING=1")? {
        info!("Notified systemd: service stopping");
    }
    Ok(())
}

/// Send a status line shown by `systemctl status`
pub fn notify_status(status: &str) -> Result<()> {
    if notify(&format!("STATUS={}", status))? {
        debug!("Notified systemd: status = {}", status);
    }
    Ok(())
}

/// Send a watchdog keepalive
pub fn notify_watchdog() -> Result<()> {
    notify("WATCHDOG=1")?;
    Ok(())
}

/// Get the watchdog timeout configured by systemd (in microseconds)
pub fn get_watchdog_timeout() -> Option<u64> {
    env::var("WATCHDOG_USEC").ok().and_then(|s| s.parse().ok())
}

/// Check if running under systemd
pub fn is_systemd() -> bool {
    env::var("NOTIFY_SOCKET").is_ok()
}

/// Spawn a task sending keepalives at half the configured watchdog interval
///
/// Returns a completed no-op task when the watchdog is not enabled.
pub async fn spawn_watchdog_task() -> Result<tokio::task::JoinHandle<()>> {
    let Some(timeout_usec) = get_watchdog_timeout() else {
        debug!("Systemd watchdog not enabled, skipping watchdog task");
        return Ok(tokio::spawn(async {}));
    };

    let interval_secs = (timeout_usec / 1_000_000) / 2;
    let interval = std::time::Duration::from_secs(interval_secs.max(1));

    info!(
        "Systemd watchdog enabled, interval: {}s (timeout: {}s)",
        interval.as_secs(),
        timeout_usec / 1_000_000
    );

    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            if let Err(e) = notify_watchdog() {
                error!("Failed to send watchdog keepalive: {:#}", e);
            }
        }
    });

    Ok(handle)
}
