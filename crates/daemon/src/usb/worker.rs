//! USB worker thread
//!
//! Dedicated thread for bus events: runs the libusb event loop, drains queued
//! hotplug notifications, and answers commands from the Tokio runtime. Probe
//! and detach handling happen on this thread; transfer completion does not.

use crate::usb::manager::DeviceManager;
use common::{InitWorker, WorkerCommand};
use rusb::UsbContext;
use std::time::Duration;
use tracing::{debug, info, warn};

pub struct UsbWorkerThread {
    manager: DeviceManager,
    worker: InitWorker,
}

impl UsbWorkerThread {
    /// Create the worker and register the hotplug callback
    ///
    /// Runs on the caller's thread so a registration failure aborts startup
    /// before the event loop ever spawns.
    pub fn new(worker: InitWorker, probe_existing: bool) -> Result<Self, rusb::Error> {
        let mut manager = DeviceManager::new(worker.submission_sender())?;
        manager.initialize(probe_existing)?;

        Ok(Self { manager, worker })
    }

    /// Create the worker without a hotplug registration
    ///
    /// Plain enumeration needs no hotplug support, so listing works on hosts
    /// where registration would fail. No probe runs and no transfer is sent.
    pub fn new_enumeration_only(worker: InitWorker) -> Result<Self, rusb::Error> {
        let manager = DeviceManager::new(worker.submission_sender())?;

        Ok(Self { manager, worker })
    }

    /// Run the USB event loop until a Shutdown command arrives
    pub fn run(mut self) -> Result<(), rusb::Error> {
        info!("USB worker thread started");

        loop {
            match self.worker.try_recv_command() {
                Some(WorkerCommand::Shutdown) => {
                    info!("USB worker shutting down");
                    break;
                }
                Some(cmd) => {
                    self.handle_command(cmd);
                }
                None => {
                    // No command, continue to USB event processing
                }
            }

            // Bounded so commands are checked regularly while handling events
            let timeout = Duration::from_millis(100);

            match self.manager.context().handle_events(Some(timeout)) {
                Ok(()) => {}
                Err(rusb::Error::Interrupted) => {
                    debug!("USB event handling interrupted");
                }
                Err(e) => {
                    // Transient event-loop errors are retried, not fatal
                    warn!("Error handling USB events: {}", e);
                    std::thread::sleep(Duration::from_millis(100));
                }
            }

            self.manager.process_hotplug_events();
        }

        info!("USB worker thread stopped");
        Ok(())
    }

    fn handle_command(&mut self, cmd: WorkerCommand) {
        match cmd {
            WorkerCommand::ListDevices { response } => {
                let devices = self.manager.list_devices();
                debug!("Listing {} matching devices", devices.len());
                let _ = response.send(devices);
            }

            WorkerCommand::Shutdown => {
                // Handled in the main loop
                unreachable!()
            }
        }
    }
}

/// Spawn the USB worker thread
///
/// Takes an already-initialized worker so hotplug registration errors were
/// surfaced to the caller before any thread exists.
pub fn spawn_usb_worker(
    worker_thread: UsbWorkerThread,
) -> std::thread::JoinHandle<Result<(), rusb::Error>> {
    std::thread::Builder::new()
        .name("usb-worker".to_string())
        .spawn(move || worker_thread.run())
        .expect("Failed to spawn USB worker thread")
}
