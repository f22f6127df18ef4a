//! Service facade: submit a file, get a job handle back immediately.
//!
//! `submit` wires a fresh progress channel between two tasks: the producer
//! runs the network attempt (worker context), the consumer pumps outcomes
//! into the event bus (delivery context). The caller holds the returned
//! `UploadJob` open until the terminal event, which is this crate's stand-in
//! for the platform wake-lock guarantee of the original service.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::channel::progress_channel;
use crate::config::UploadConfig;
use crate::executor::{UploadExecutor, UploadRequest};
use crate::notifier::{EventBus, Notifier};

pub struct UploadService {
    executor: Arc<UploadExecutor>,
    config: UploadConfig,
    bus: EventBus,
}

impl UploadService {
    /// Build the service against an externally owned event bus.
    pub fn new(config: UploadConfig, bus: &EventBus) -> Result<Self> {
        config.validate()?;
        let executor =
            Arc::new(UploadExecutor::new(&config).context("failed to build HTTP client")?);
        Ok(Self {
            executor,
            config,
            bus: bus.clone(),
        })
    }

    /// Start one upload attempt and return immediately. Recipient and
    /// content type come from configuration; each attempt gets its own
    /// channel, never one shared with an in-flight request.
    pub fn submit(&self, file_path: impl Into<PathBuf>) -> UploadJob {
        let request = UploadRequest {
            file_path: file_path.into(),
            recipient: self.config.recipient.clone(),
            content_kind: self.config.content_kind,
        };
        tracing::info!(file = %request.file_path.display(), "upload submitted");

        let (tx, rx) = progress_channel();
        let cancel = CancellationToken::new();

        let consumer = tokio::spawn(Notifier::new(&self.bus).pump(rx));

        let executor = self.executor.clone();
        let token = cancel.clone();
        let producer = tokio::spawn(async move { executor.execute(request, tx, token).await });

        UploadJob {
            producer,
            consumer,
            cancel,
        }
    }
}

/// Handle to one in-flight upload attempt.
pub struct UploadJob {
    producer: JoinHandle<()>,
    consumer: JoinHandle<()>,
    cancel: CancellationToken,
}

impl UploadJob {
    /// Request cancellation. The attempt aborts between chunks and surfaces
    /// a `Failed(Cancelled)` terminal event; already-flushed bytes are gone.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait until the terminal event has been delivered to listeners.
    pub async fn wait(self) -> Result<()> {
        self.producer.await.context("upload task panicked")?;
        self.consumer.await.context("notifier task panicked")?;
        Ok(())
    }
}
