//! USB subsystem
//!
//! Hotplug detection and the one-shot initialization of attached Nanofaces.
//! Bus events are handled on a dedicated worker thread; submitted init
//! requests cross the bridge to the Tokio runtime, which executes them on the
//! blocking pool and logs the completion.

pub mod manager;
pub mod probe;
pub mod worker;

pub use worker::{UsbWorkerThread, spawn_usb_worker};
