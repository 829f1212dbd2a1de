//! Attach handler
//!
//! One best-effort initialization per attach event, then unconditionally
//! decline ownership: the daemon keeps no handle, no registry entry, and no
//! state tying this device to any later event.

use common::init::InitRequest;
use common::{Error, Result, SubmissionSender};
use rusb::{Context, Device};
use tracing::{error, info, warn};

/// Result of probing a newly attached device
#[derive(Debug)]
pub enum ProbeOutcome {
    /// Normal path: the device was inspected (and an init transfer may be in
    /// flight) but the daemon retains no ownership of it.
    Declined,
    /// The synchronous hand-off to the completion executor failed; no transfer
    /// was queued and no completion will run.
    SubmitFailed(Error),
}

/// Probe a matching device: allocate one init request, submit it, decline
///
/// Returns before the transfer executes. On the success path exactly one
/// request is in flight when this returns; the completion executor owns it.
pub fn probe_device(submit_tx: &SubmissionSender, device: &Device<Context>) -> ProbeOutcome {
    probe_with(submit_tx, || InitRequest::allocate(device))
}

/// Probe body, parameterized over request allocation
fn probe_with<F>(submit_tx: &SubmissionSender, allocate: F) -> ProbeOutcome
where
    F: FnOnce() -> Result<Box<InitRequest>>,
{
    let request = match allocate() {
        Ok(request) => request,
        Err(e) => {
            warn!(
                "ALVA Nanoface initialization failed: cannot allocate init request: {}",
                e
            );
            return ProbeOutcome::Declined;
        }
    };

    info!(
        "ALVA Nanoface ({:04x}:{:04x}) connected",
        request.vendor_id(),
        request.product_id()
    );

    // Fire-and-forget: the request moves to the completion executor. try_send
    // keeps the bus-event thread from ever blocking here.
    if let Err(e) = submit_tx.try_send(request) {
        let error = Error::Channel(e.to_string());
        error!(
            "ALVA Nanoface initialization failed: error submitting init request: {}",
            error
        );
        return ProbeOutcome::SubmitFailed(error);
    }

    ProbeOutcome::Declined
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::create_init_bridge;
    use common::test_utils::create_mock_init_request;

    #[tokio::test]
    async fn test_allocation_failure_declines_without_submitting() {
        let (bridge, worker) = create_init_bridge();

        let outcome = probe_with(&worker.submission_sender(), || {
            Err(Error::Usb(rusb::Error::NoDevice))
        });
        assert!(matches!(outcome, ProbeOutcome::Declined));

        // With all senders gone, a queued request would still be delivered;
        // an error here proves nothing was submitted.
        drop(worker);
        assert!(bridge.recv_submission().await.is_err());
    }

    #[tokio::test]
    async fn test_successful_probe_submits_one_request_and_declines() {
        let (bridge, worker) = create_init_bridge();

        let outcome = probe_with(&worker.submission_sender(), || Ok(create_mock_init_request()));
        assert!(matches!(outcome, ProbeOutcome::Declined));

        let request = bridge
            .recv_submission()
            .await
            .expect("Expected a submitted request");
        assert_eq!(request.vendor_id(), 0x0a4a);
        assert_eq!(request.product_id(), 0xaffe);

        // Exactly one request per attach event
        drop(worker);
        assert!(bridge.recv_submission().await.is_err());
    }

    #[test]
    fn test_submission_failure_carries_cause() {
        let (bridge, worker) = create_init_bridge();
        let submit_tx = worker.submission_sender();

        // Dropping the runtime side closes the submission channel, so the
        // synchronous hand-off fails and no completion can ever run.
        drop(bridge);

        let outcome = probe_with(&submit_tx, || Ok(create_mock_init_request()));
        match outcome {
            ProbeOutcome::SubmitFailed(Error::Channel(_)) => {}
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
}
