//! Test utilities for nanoface-init
//!
//! Mock builders and helpers shared by unit and integration tests.

use crate::device::{DeviceSummary, PID_NANOFACE, VID_NANOFACE};
use crate::init::InitRequest;
use std::future::Future;
use std::time::Duration;

/// Default test timeout (5 seconds)
pub const DEFAULT_TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Create a mock DeviceSummary with the Nanoface identity
pub fn create_mock_summary(bus_number: u8, device_address: u8) -> DeviceSummary {
    DeviceSummary {
        bus_number,
        device_address,
        vendor_id: VID_NANOFACE,
        product_id: PID_NANOFACE,
        manufacturer: Some("ALVA".to_string()),
        product: Some("Nanoface".to_string()),
    }
}

/// Create a list of mock summaries on bus 1, addresses 1..=count
pub fn create_mock_summary_list(count: u8) -> Vec<DeviceSummary> {
    (1..=count).map(|addr| create_mock_summary(1, addr)).collect()
}

/// Create a mock init request with the Nanoface identity and no device handle
///
/// `execute` on a mock request fails with `rusb::Error::NoDevice`; everything
/// else (submission, completion, release) behaves like a real request.
pub fn create_mock_init_request() -> Box<InitRequest> {
    InitRequest::without_handle()
}

/// Run a future with a timeout, panicking on expiry
pub async fn with_timeout<F, T>(timeout: Duration, future: F) -> T
where
    F: Future<Output = T>,
{
    tokio::time::timeout(timeout, future)
        .await
        .expect("Test timed out")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_summary_identity() {
        let summary = create_mock_summary(1, 4);
        assert_eq!(summary.vendor_id, VID_NANOFACE);
        assert_eq!(summary.product_id, PID_NANOFACE);
        assert_eq!(summary.bus_number, 1);
        assert_eq!(summary.device_address, 4);
    }

    #[test]
    fn test_mock_summary_list() {
        let list = create_mock_summary_list(3);
        assert_eq!(list.len(), 3);
        assert_eq!(list[2].device_address, 3);
    }

    #[test]
    fn test_mock_request_identity() {
        let request = create_mock_init_request();
        assert_eq!(request.vendor_id(), VID_NANOFACE);
        assert_eq!(request.product_id(), PID_NANOFACE);
    }
}
