//! USB device manager
//!
//! Owns the libusb context and the hotplug registration for the Nanoface
//! identity filter. Arrivals are dispatched to the probe, departures to the
//! detach log. The manager deliberately keeps no device registry: the probe
//! always declines ownership, so attach events leave nothing behind to track.

use crate::usb::probe::{ProbeOutcome, probe_device};
use common::device::{DeviceSummary, PID_NANOFACE, VID_NANOFACE, matches_identity};
use common::SubmissionSender;
use rusb::{Context, Device, Hotplug, HotplugBuilder, Registration, UsbContext};
use std::sync::mpsc;
use tracing::{debug, error, info};

/// Hotplug notifications queued by the libusb callback
///
/// The callback runs inside `handle_events`; it only queues, the worker loop
/// does the actual dispatch afterwards.
enum HotplugEvent {
    Arrived(Device<Context>),
    Left { bus_number: u8, device_address: u8 },
}

pub struct DeviceManager {
    /// USB context for device operations
    context: Context,
    /// Sender half of the submission channel, handed to the probe
    submit_tx: SubmissionSender,
    /// Queue filled by the hotplug callback, drained by the worker loop
    hotplug_rx: mpsc::Receiver<HotplugEvent>,
    hotplug_tx: mpsc::Sender<HotplugEvent>,
    /// Hotplug registration; dropping it deregisters the callback
    _hotplug_registration: Option<Registration<Context>>,
}

impl DeviceManager {
    /// Create a new device manager
    pub fn new(submit_tx: SubmissionSender) -> Result<Self, rusb::Error> {
        let context = Context::new()?;
        let (hotplug_tx, hotplug_rx) = mpsc::channel();

        Ok(Self {
            context,
            submit_tx,
            hotplug_rx,
            hotplug_tx,
            _hotplug_registration: None,
        })
    }

    /// Register the hotplug callback for the Nanoface identity filter
    ///
    /// With `probe_existing`, devices already connected are replayed through
    /// the callback (the userspace counterpart of probing on driver load).
    /// Failure propagates unchanged to the caller, which aborts startup.
    pub fn initialize(&mut self, probe_existing: bool) -> Result<(), rusb::Error> {
        if !rusb::has_hotplug() {
            error!("libusb hotplug support is not available on this platform");
            return Err(rusb::Error::NotSupported);
        }

        let callback = HotplugCallback {
            queue: self.hotplug_tx.clone(),
        };

        let registration = HotplugBuilder::new()
            .vendor_id(VID_NANOFACE)
            .product_id(PID_NANOFACE)
            .enumerate(probe_existing)
            .register(&self.context, Box::new(callback))?;

        self._hotplug_registration = Some(registration);
        info!(
            "Registered for {:04x}:{:04x} hotplug events (probe_existing: {})",
            VID_NANOFACE, PID_NANOFACE, probe_existing
        );
        Ok(())
    }

    /// Dispatch queued hotplug events
    pub fn process_hotplug_events(&mut self) {
        while let Ok(event) = self.hotplug_rx.try_recv() {
            match event {
                HotplugEvent::Arrived(device) => self.handle_device_arrived(device),
                HotplugEvent::Left {
                    bus_number,
                    device_address,
                } => self.handle_device_left(bus_number, device_address),
            }
        }
    }

    /// Attach handler entry point: probe, then forget the device
    fn handle_device_arrived(&mut self, device: Device<Context>) {
        match probe_device(&self.submit_tx, &device) {
            ProbeOutcome::Declined => {
                debug!(
                    "Probe complete, not retaining device (bus={}, addr={})",
                    device.bus_number(),
                    device.address()
                );
            }
            ProbeOutcome::SubmitFailed(e) => {
                error!(
                    "Probe failed for device (bus={}, addr={}): {}",
                    device.bus_number(),
                    device.address(),
                    e
                );
            }
        }
        // The device reference drops here; no state survives the probe.
    }

    /// Detach handler: observability only
    fn handle_device_left(&self, bus_number: u8, device_address: u8) {
        info!("ALVA Nanoface disconnected");
        debug!(
            "Device left (bus={}, addr={}), nothing to release",
            bus_number, device_address
        );
    }

    /// Enumerate matching devices for `--list-devices`
    ///
    /// Summaries are built from a fresh enumeration; string descriptors are
    /// best-effort (reading them needs an open handle, which may be denied).
    pub fn list_devices(&self) -> Vec<DeviceSummary> {
        let mut summaries = Vec::new();

        let Ok(devices) = self.context.devices() else {
            return summaries;
        };

        for device in devices.iter() {
            let Ok(descriptor) = device.device_descriptor() else {
                continue;
            };
            if !matches_identity(descriptor.vendor_id(), descriptor.product_id()) {
                continue;
            }

            let strings = device.open().ok().map(|handle| {
                (
                    handle.read_manufacturer_string_ascii(&descriptor).ok(),
                    handle.read_product_string_ascii(&descriptor).ok(),
                )
            });
            let (manufacturer, product) = strings.unwrap_or((None, None));

            summaries.push(DeviceSummary {
                bus_number: device.bus_number(),
                device_address: device.address(),
                vendor_id: descriptor.vendor_id(),
                product_id: descriptor.product_id(),
                manufacturer,
                product,
            });
        }

        summaries
    }

    /// Get the USB context
    pub fn context(&self) -> &Context {
        &self.context
    }
}

/// Hotplug callback handler
///
/// Runs inside `handle_events` on the USB thread; it must not touch the
/// manager, so it forwards events through the internal queue.
struct HotplugCallback {
    queue: mpsc::Sender<HotplugEvent>,
}

impl Hotplug<Context> for HotplugCallback {
    fn device_arrived(&mut self, device: Device<Context>) {
        debug!(
            "Hotplug callback: device arrived (bus={}, addr={})",
            device.bus_number(),
            device.address()
        );
        let _ = self.queue.send(HotplugEvent::Arrived(device));
    }

    fn device_left(&mut self, device: Device<Context>) {
        debug!(
            "Hotplug callback: device left (bus={}, addr={})",
            device.bus_number(),
            device.address()
        );
        let _ = self.queue.send(HotplugEvent::Left {
            bus_number: device.bus_number(),
            device_address: device.address(),
        });
    }
}
