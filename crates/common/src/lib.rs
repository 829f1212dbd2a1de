//! Common vocabulary for nanoface-init
//!
//! This crate holds everything shared between the daemon binary and its USB
//! worker thread: the device identity filter, the one-shot initialization
//! request and its fixed payload, the async channel bridge between the Tokio
//! runtime and the USB thread, error handling, and logging setup.

pub mod channel;
pub mod device;
pub mod error;
pub mod init;
pub mod logging;
pub mod test_utils;

pub use channel::{InitBridge, InitWorker, SubmissionSender, WorkerCommand, create_init_bridge};
pub use device::{DeviceSummary, PID_NANOFACE, VID_NANOFACE, matches_identity};
pub use error::{Error, Result};
pub use init::{INIT_SETUP, INIT_SETUP_BYTES, InitRequest, SetupPacket, complete};
pub use logging::setup_logging;
