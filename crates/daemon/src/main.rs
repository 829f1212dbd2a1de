//! nanoface-initd
//!
//! Userspace initializer for the ALVA Nanoface USB audio interface. Waits for
//! hotplug arrival of a Nanoface (0x0a4a:0xaffe), sends the single control
//! transfer that enables the device's audio I/O connections, and retains no
//! ownership of the device afterwards. The audio streaming path itself is out
//! of scope; this daemon only flips the initialization switch.

mod config;
mod service;
mod usb;

use anyhow::{Context, Result};
use clap::Parser;
use common::{InitBridge, WorkerCommand, create_init_bridge, init, setup_logging};
use tokio::signal;
use tracing::{error, info};
use usb::{UsbWorkerThread, spawn_usb_worker};

#[derive(Parser, Debug)]
#[command(name = "nanoface-initd")]
#[command(
    author,
    version,
    about = "Initializes ALVA Nanoface USB audio interfaces on hotplug"
)]
#[command(long_about = "
Waits for an ALVA Nanoface USB audio interface to be connected and sends the
one-shot control transfer that enables its audio I/O connections. The daemon
keeps no per-device state and does not handle audio itself.

EXAMPLES:
    # Run in the foreground with default config
    nanoface-initd

    # Run as a systemd service (Type=notify)
    nanoface-initd --service

    # List connected Nanoface devices and exit
    nanoface-initd --list-devices

    # Run with debug logging
    nanoface-initd --log-level debug

CONFIGURATION:
    The daemon looks for configuration files in the following order:
    1. Path specified with --config
    2. ~/.config/nanoface-init/daemon.toml
    3. /etc/nanoface-init/daemon.toml
    4. Built-in defaults
")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<std::path::PathBuf>,

    /// Save default configuration to default location and exit
    #[arg(long)]
    save_config: bool,

    /// Run as systemd service
    #[arg(long)]
    service: bool,

    /// List connected Nanoface devices and exit
    #[arg(long)]
    list_devices: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.save_config {
        let config = config::DaemonConfig::default();
        let path = config::DaemonConfig::default_path();
        config.save(&path).context("Failed to save configuration")?;
        println!("Configuration saved to: {}", path.display());
        return Ok(());
    }

    let config = if let Some(ref path) = args.config {
        config::DaemonConfig::load(Some(path.clone())).context("Failed to load configuration")?
    } else {
        config::DaemonConfig::load_or_default()
    };

    let log_level = args
        .log_level
        .as_deref()
        .unwrap_or(&config.daemon.log_level);

    setup_logging(log_level).context("Failed to setup logging")?;

    info!("nanoface-initd v{}", env!("CARGO_PKG_VERSION"));
    info!("Log level: {}", log_level);

    let (bridge, worker) = create_init_bridge();

    // Hotplug registration runs here, before the thread spawns; a failure
    // aborts startup instead of surfacing later inside the event loop. When
    // only listing, registration is skipped entirely: enumeration needs no
    // hotplug support and no init transfer may be sent as a side effect.
    let worker_thread = if args.list_devices {
        UsbWorkerThread::new_enumeration_only(worker)
    } else {
        UsbWorkerThread::new(worker, config.usb.probe_existing)
    }
    .context("Failed to initialize USB subsystem")?;
    let usb_handle = spawn_usb_worker(worker_thread);

    let service_mode = args.service || config.daemon.service_mode;

    let result = if args.list_devices {
        list_devices_mode(&bridge).await
    } else {
        run_daemon(service_mode, &bridge).await
    };

    info!("Shutting down USB subsystem...");
    if let Err(e) = bridge.send_command(WorkerCommand::Shutdown).await {
        error!("Error shutting down USB worker: {:#}", e);
    }

    match usb_handle.join() {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!("USB worker exited with error: {}", e),
        Err(e) => error!("USB worker thread panicked: {:?}", e),
    }

    result
}

/// List matching devices and exit
async fn list_devices_mode(bridge: &InitBridge) -> Result<()> {
    let (tx, rx) = tokio::sync::oneshot::channel();
    bridge
        .send_command(WorkerCommand::ListDevices { response: tx })
        .await
        .context("Failed to send ListDevices command")?;

    let devices = rx.await.context("Failed to receive device list")?;

    if devices.is_empty() {
        println!("No ALVA Nanoface devices found.");
    } else {
        println!("Found {} ALVA Nanoface device(s):\n", devices.len());
        for device in devices {
            println!(
                "  {:04x}:{:04x} - {} {}",
                device.vendor_id,
                device.product_id,
                device
                    .manufacturer
                    .as_deref()
                    .unwrap_or("Unknown Manufacturer"),
                device.product.as_deref().unwrap_or("Unknown Product")
            );
            println!(
                "      Bus {:03} Device {:03}",
                device.bus_number, device.device_address
            );
            println!();
        }
    }

    Ok(())
}

/// Main daemon loop: execute submitted init requests until Ctrl+C
///
/// Each submitted request runs on the blocking pool, the completion context of
/// this design: it executes the transfer, logs the outcome, and releases the
/// request. The probe on the USB thread never waits for any of this.
async fn run_daemon(service_mode: bool, bridge: &InitBridge) -> Result<()> {
    if service_mode && service::is_systemd() {
        info!("Running under systemd");
    }

    let watchdog_handle = service::spawn_watchdog_task()
        .await
        .context("Failed to spawn watchdog task")?;

    service::notify_ready().context("Failed to notify systemd ready")?;
    service::notify_status("Waiting for Nanoface hotplug events")
        .context("Failed to send status to systemd")?;

    info!("Waiting for Nanoface hotplug events, press Ctrl+C to shutdown");

    loop {
        tokio::select! {
            signal = signal::ctrl_c() => {
                match signal {
                    Ok(()) => info!("Received Ctrl+C, shutting down gracefully..."),
                    Err(e) => error!("Error waiting for Ctrl+C: {}", e),
                }
                break;
            }

            submission = bridge.recv_submission() => {
                match submission {
                    Ok(request) => {
                        tokio::task::spawn_blocking(move || {
                            let mut request = request;
                            let result = request.execute();
                            init::complete(request, result);
                        });
                    }
                    Err(e) => {
                        error!("Submission channel closed: {}", e);
                        break;
                    }
                }
            }
        }
    }

    service::notify_stopping().context("Failed to notify systemd stopping")?;
    watchdog_handle.abort();

    Ok(())
}
