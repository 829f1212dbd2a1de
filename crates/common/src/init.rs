//! One-shot initialization transfer
//!
//! The Nanoface enables its audio I/O connections after receiving a single
//! control transfer on the default control endpoint. The 8-byte setup packet
//! is fixed and the data stage is empty; `INIT_SETUP_BYTES` pins the exact
//! wire encoding the hardware expects.
//!
//! An [`InitRequest`] is a single-owner value: allocated by the probe, moved
//! into the submission channel, executed and released by the completion task.
//! It is never resubmitted or reused.

use crate::device::{PID_NANOFACE, VID_NANOFACE};
use crate::error::Result;
use rusb::{Context, Device, DeviceHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Exact wire encoding of the initialization setup packet
pub const INIT_SETUP_BYTES: [u8; 8] = [0x01, 0x0b, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00];

/// Setup stage of the initialization transfer
///
/// bmRequestType 0x01 (host-to-device, standard, interface), bRequest 0x0b,
/// wValue 0, wIndex 1, wLength 0.
pub const INIT_SETUP: SetupPacket = SetupPacket {
    request_type: 0x01,
    request: 0x0b,
    value: 0x0000,
    index: 0x0001,
    length: 0x0000,
};

/// Transfer timeout
///
/// The synchronous libusb API requires a bound; an unanswered init transfer is
/// reported as a completion failure rather than hanging the completion task.
const INIT_TIMEOUT: Duration = Duration::from_secs(1);

/// The 8-byte setup header of a USB control transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetupPacket {
    pub request_type: u8,
    pub request: u8,
    pub value: u16,
    pub index: u16,
    pub length: u16,
}

impl SetupPacket {
    /// Encode to the standard little-endian setup layout
    pub fn encode(&self) -> [u8; 8] {
        let value = self.value.to_le_bytes();
        let index = self.index.to_le_bytes();
        let length = self.length.to_le_bytes();
        [
            self.request_type,
            self.request,
            value[0],
            value[1],
            index[0],
            index[1],
            length[0],
            length[1],
        ]
    }

    /// Decode from the standard little-endian setup layout
    pub fn decode(bytes: &[u8; 8]) -> Self {
        Self {
            request_type: bytes[0],
            request: bytes[1],
            value: u16::from_le_bytes([bytes[2], bytes[3]]),
            index: u16::from_le_bytes([bytes[4], bytes[5]]),
            length: u16::from_le_bytes([bytes[6], bytes[7]]),
        }
    }
}

/// One in-flight initialization transfer
///
/// Requests built by [`InitRequest::allocate`] own the device handle for
/// their whole lifetime; dropping the request closes the handle and releases
/// the libusb device reference.
pub struct InitRequest {
    /// Present on every request built by `allocate`; only the test doubles
    /// from `test_utils` leave it empty.
    handle: Option<DeviceHandle<Context>>,
    bus_number: u8,
    device_address: u8,
    vendor_id: u16,
    product_id: u16,
    setup: SetupPacket,
    /// Zero-length data stage
    data: Vec<u8>,
}

impl InitRequest {
    /// Allocate a request for a newly attached device
    ///
    /// Reads the descriptor and opens the device. This is the probe's only
    /// fallible resource acquisition; on failure the probe logs and declines.
    pub fn allocate(device: &Device<Context>) -> Result<Box<Self>> {
        let descriptor = device.device_descriptor()?;
        let handle = device.open()?;

        Ok(Box::new(Self {
            handle: Some(handle),
            bus_number: device.bus_number(),
            device_address: device.address(),
            vendor_id: descriptor.vendor_id(),
            product_id: descriptor.product_id(),
            setup: INIT_SETUP,
            data: Vec::new(),
        }))
    }

    pub fn vendor_id(&self) -> u16 {
        self.vendor_id
    }

    pub fn product_id(&self) -> u16 {
        self.product_id
    }

    pub fn bus_number(&self) -> u8 {
        self.bus_number
    }

    pub fn device_address(&self) -> u8 {
        self.device_address
    }

    /// Build a request with the Nanoface identity and no device handle
    ///
    /// Used by `test_utils`; `execute` on such a request fails with
    /// `rusb::Error::NoDevice`.
    pub(crate) fn without_handle() -> Box<Self> {
        Box::new(Self {
            handle: None,
            bus_number: 1,
            device_address: 2,
            vendor_id: VID_NANOFACE,
            product_id: PID_NANOFACE,
            setup: INIT_SETUP,
            data: Vec::new(),
        })
    }

    /// Send the transfer to the default control endpoint
    ///
    /// Blocks until the device answers or the timeout elapses; runs on the
    /// completion executor, never on the bus-event thread.
    pub fn execute(&mut self) -> Result<usize> {
        debug!(
            "Init transfer: setup={:02x?}, data_len={}, bus={}, addr={}",
            self.setup.encode(),
            self.data.len(),
            self.bus_number,
            self.device_address
        );

        let Some(handle) = self.handle.as_ref() else {
            return Err(rusb::Error::NoDevice.into());
        };

        let written = handle.write_control(
            self.setup.request_type,
            self.setup.request,
            self.setup.value,
            self.setup.index,
            &self.data,
            INIT_TIMEOUT,
        )?;

        Ok(written)
    }
}

/// Finalize a submitted request
///
/// Logs the completion outcome and releases the request. Called exactly once
/// per submitted request; nothing may touch the request afterwards.
pub fn complete(request: Box<InitRequest>, result: Result<usize>) {
    match result {
        Ok(_) => info!("ALVA Nanoface initialized"),
        Err(e) => warn!("ALVA Nanoface initialization failed: {}", e),
    }
    drop(request);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_setup_encoding_is_exact() {
        assert_eq!(INIT_SETUP.encode(), INIT_SETUP_BYTES);
        assert_eq!(INIT_SETUP.encode(), [0x01, 0x0b, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn test_init_setup_fields() {
        assert_eq!(INIT_SETUP.request_type, 0x01);
        assert_eq!(INIT_SETUP.request, 0x0b);
        assert_eq!(INIT_SETUP.value, 0);
        assert_eq!(INIT_SETUP.index, 1);
        // Zero-length data stage
        assert_eq!(INIT_SETUP.length, 0);
    }

    #[test]
    fn test_setup_packet_roundtrip() {
        let packet = SetupPacket {
            request_type: 0xc0,
            request: 0x06,
            value: 0x1234,
            index: 0x5678,
            length: 0x9abc,
        };
        assert_eq!(SetupPacket::decode(&packet.encode()), packet);
    }

    #[test]
    fn test_setup_packet_decode_init_bytes() {
        assert_eq!(SetupPacket::decode(&INIT_SETUP_BYTES), INIT_SETUP);
    }

    #[test]
    fn test_init_setup_is_host_to_device() {
        // Bit 7 of bmRequestType: 0 = OUT (host to device)
        assert_eq!(INIT_SETUP.request_type & 0x80, 0);
    }

    #[test]
    fn test_execute_without_handle_fails() {
        let mut request = InitRequest::without_handle();
        assert!(matches!(
            request.execute(),
            Err(crate::Error::Usb(rusb::Error::NoDevice))
        ));
    }

    #[test]
    fn test_complete_consumes_request_on_either_outcome() {
        complete(InitRequest::without_handle(), Ok(0));
        complete(
            InitRequest::without_handle(),
            Err(rusb::Error::Timeout.into()),
        );
    }
}
