//! Bridge integration tests
//!
//! Tests for the async channel bridge between the Tokio runtime and the USB
//! thread: command flow across a real thread boundary, shutdown ordering, and
//! failure behavior once either side is gone.
//!
//! Run with: `cargo test -p common --test bridge_tests`

use common::test_utils::{DEFAULT_TEST_TIMEOUT, create_mock_summary_list, with_timeout};
use common::{WorkerCommand, create_init_bridge};
use std::thread;
use tokio::sync::oneshot;

#[test]
fn test_create_init_bridge() {
    let (bridge, worker) = create_init_bridge();
    drop(bridge);
    drop(worker);
}

#[tokio::test]
async fn test_list_devices_command_flow() {
    let (bridge, worker) = create_init_bridge();

    // Worker thread answers one ListDevices command with mock summaries
    let handle = thread::spawn(move || {
        let cmd = worker.recv_command().expect("Failed to receive command");
        if let WorkerCommand::ListDevices { response } = cmd {
            let _ = response.send(create_mock_summary_list(2));
            true
        } else {
            false
        }
    });

    let (tx, rx) = oneshot::channel();
    bridge
        .send_command(WorkerCommand::ListDevices { response: tx })
        .await
        .expect("Failed to send command");

    let devices = with_timeout(DEFAULT_TEST_TIMEOUT, rx)
        .await
        .expect("Failed to receive response");
    assert_eq!(devices.len(), 2);
    assert_eq!(devices[0].vendor_id, 0x0a4a);
    assert_eq!(devices[0].product_id, 0xaffe);

    assert!(handle.join().expect("Worker thread panicked"));
}

#[tokio::test]
async fn test_shutdown_is_last_command() {
    let (bridge, worker) = create_init_bridge();

    let handle = thread::spawn(move || {
        let mut seen = Vec::new();
        while let Ok(cmd) = worker.recv_command() {
            let is_shutdown = matches!(cmd, WorkerCommand::Shutdown);
            seen.push(is_shutdown);
            if is_shutdown {
                break;
            }
        }
        seen
    });

    let (tx, _rx) = oneshot::channel();
    bridge
        .send_command(WorkerCommand::ListDevices { response: tx })
        .await
        .expect("Failed to send ListDevices");
    bridge
        .send_command(WorkerCommand::Shutdown)
        .await
        .expect("Failed to send Shutdown");
    drop(bridge);

    let seen = handle.join().expect("Worker thread panicked");
    assert_eq!(seen, vec![false, true]);
}

#[tokio::test]
async fn test_commands_fail_once_worker_is_gone() {
    let (bridge, worker) = create_init_bridge();
    drop(worker);

    assert!(bridge.send_command(WorkerCommand::Shutdown).await.is_err());
    assert!(bridge.recv_submission().await.is_err());
}

#[tokio::test]
async fn test_dropped_response_channel_does_not_wedge_worker() {
    let (bridge, worker) = create_init_bridge();

    let handle = thread::spawn(move || {
        // The runtime side dropped its receiver; sending the response fails
        // but the worker keeps running.
        if let Ok(WorkerCommand::ListDevices { response }) = worker.recv_command() {
            response.send(Vec::new()).is_err()
        } else {
            false
        }
    });

    let (tx, rx) = oneshot::channel();
    drop(rx);
    bridge
        .send_command(WorkerCommand::ListDevices { response: tx })
        .await
        .expect("Failed to send command");

    assert!(handle.join().expect("Worker thread panicked"));
}
