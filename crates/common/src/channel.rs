//! Async channel bridge between the Tokio runtime and the USB thread
//!
//! Commands flow from the runtime to the USB thread; submitted init requests
//! flow the other way, from the probe to the completion executor. A request
//! moves through the submission channel by value, so exactly one owner holds
//! it at any time.

use crate::device::DeviceSummary;
use crate::init::InitRequest;
use async_channel::{Receiver, Sender, bounded};

/// Sender half of the submission channel, handed to the probe
pub type SubmissionSender = Sender<Box<InitRequest>>;

/// Commands from the Tokio runtime to the USB thread
#[derive(Debug)]
pub enum WorkerCommand {
    /// Enumerate matching devices
    ListDevices {
        /// Channel to send the summaries back
        response: tokio::sync::oneshot::Sender<Vec<DeviceSummary>>,
    },

    /// Shut down the USB thread gracefully
    Shutdown,
}

/// Handle for the Tokio runtime (async)
#[derive(Clone)]
pub struct InitBridge {
    cmd_tx: Sender<WorkerCommand>,
    submit_rx: Receiver<Box<InitRequest>>,
}

impl InitBridge {
    /// Send a command to the USB thread
    pub async fn send_command(&self, cmd: WorkerCommand) -> crate::Result<()> {
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|e| crate::Error::Channel(e.to_string()))
    }

    /// Receive the next submitted init request
    pub async fn recv_submission(&self) -> crate::Result<Box<InitRequest>> {
        self.submit_rx
            .recv()
            .await
            .map_err(|e| crate::Error::Channel(e.to_string()))
    }
}

/// Handle for the USB thread (blocking)
pub struct InitWorker {
    cmd_rx: Receiver<WorkerCommand>,
    submit_tx: SubmissionSender,
}

impl InitWorker {
    /// Receive a command from the Tokio runtime (blocking)
    pub fn recv_command(&self) -> crate::Result<WorkerCommand> {
        self.cmd_rx
            .recv_blocking()
            .map_err(|e| crate::Error::Channel(e.to_string()))
    }

    /// Try to receive a command without blocking
    pub fn try_recv_command(&self) -> Option<WorkerCommand> {
        self.cmd_rx.try_recv().ok()
    }

    /// Clone the submission sender for the probe
    ///
    /// Submission uses `try_send` so a failure surfaces synchronously at the
    /// probe instead of blocking the bus-event thread.
    pub fn submission_sender(&self) -> SubmissionSender {
        self.submit_tx.clone()
    }
}

/// Create the channel bridge between the Tokio runtime and the USB thread
///
/// Returns (InitBridge for Tokio, InitWorker for the USB thread).
pub fn create_init_bridge() -> (InitBridge, InitWorker) {
    let (cmd_tx, cmd_rx) = bounded(16);
    let (submit_tx, submit_rx) = bounded(16);

    (
        InitBridge { cmd_tx, submit_rx },
        InitWorker { cmd_rx, submit_tx },
    )
}
