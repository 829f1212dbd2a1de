//! Device identity and enumeration summaries
//!
//! The identity filter is a single fixed (vendor, product) pair. It is applied
//! by the hotplug registration and re-checked in software when enumerating for
//! `--list-devices`.

/// USB vendor id of the ALVA Nanoface
pub const VID_NANOFACE: u16 = 0x0a4a;

/// USB product id of the ALVA Nanoface
pub const PID_NANOFACE: u16 = 0xaffe;

/// Check whether a (vendor, product) pair matches the Nanoface identity filter
pub fn matches_identity(vendor_id: u16, product_id: u16) -> bool {
    vendor_id == VID_NANOFACE && product_id == PID_NANOFACE
}

/// Snapshot of a matching device, gathered on demand for listing
///
/// The daemon keeps no device registry; summaries are built from a fresh
/// enumeration each time they are requested.
#[derive(Debug, Clone)]
pub struct DeviceSummary {
    pub bus_number: u8,
    pub device_address: u8,
    pub vendor_id: u16,
    pub product_id: u16,
    /// Manufacturer string descriptor, if the device could be opened
    pub manufacturer: Option<String>,
    /// Product string descriptor, if the device could be opened
    pub product: Option<String>,
}
