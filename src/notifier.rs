//! Broadcast delivery of upload status to decoupled listeners.
//!
//! The bus is created once at startup and handed by reference to whoever
//! needs to publish or subscribe; there is no ambient global. Delivery is
//! fire-and-forget: no listener, no problem; a lagging listener loses old
//! messages instead of backpressuring the publisher.

use tokio::sync::broadcast;

use crate::channel::{ProgressReceiver, UploadOutcome};
use crate::errors::UploadError;

/// Name of the logical status channel.
pub const STATUS_CHANNEL: &str = "upload.status";

const DEFAULT_BUS_CAPACITY: usize = 64;

/// In-process publish/subscribe bus carrying status messages.
///
/// Listeners registered after an event was published never see it; there is
/// no replay buffer.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<String>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.sender.subscribe()
    }

    /// Publish a message to all current subscribers. Never blocks; the
    /// send error for "no receivers" is deliberately ignored.
    pub fn publish(&self, message: String) {
        let _ = self.sender.send(message);
    }

    pub fn channel_name(&self) -> &'static str {
        STATUS_CHANNEL
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_BUS_CAPACITY)
    }
}

/// Consumer-side pump: turns `UploadOutcome`s into broadcast messages and
/// log records. Runs on the delivery task, never on the network task.
pub struct Notifier {
    bus: EventBus,
}

impl Notifier {
    pub fn new(bus: &EventBus) -> Self {
        Self { bus: bus.clone() }
    }

    /// Drain the channel until its terminal event, publishing as we go.
    pub async fn pump(self, mut rx: ProgressReceiver) {
        while let Some(outcome) = rx.recv().await {
            let terminal = outcome.is_terminal();
            match outcome {
                UploadOutcome::Progress(ratio) => self.on_progress(ratio),
                UploadOutcome::Succeeded => self.on_success(),
                UploadOutcome::Failed(err) => self.on_error(&err),
            }
            if terminal {
                break;
            }
        }
    }

    fn on_progress(&self, ratio: f64) {
        let percent = (100.0 * ratio) as u32;
        self.bus
            .publish(format!("Uploading in progress...{percent}"));
        tracing::info!(
            channel = self.bus.channel_name(),
            progress = ratio,
            "upload progress"
        );
    }

    fn on_success(&self) {
        self.bus.publish("File uploading successful".to_string());
        tracing::info!(channel = self.bus.channel_name(), "file uploaded");
    }

    fn on_error(&self, err: &UploadError) {
        self.bus.publish(format!("Error in file upload {err}"));
        tracing::error!(
            channel = self.bus.channel_name(),
            error = %err,
            "upload failed"
        );
    }
}
