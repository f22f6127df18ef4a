//! Single-attempt multipart upload execution.

use std::path::PathBuf;
use std::sync::Arc;

use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client};
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;

use crate::body::{ProgressObserver, ProgressStream};
use crate::channel::{ProgressSender, UploadOutcome};
use crate::config::{ContentKind, UploadConfig};
use crate::errors::UploadError;

/// One upload attempt's input. Immutable; consumed by `execute`.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub file_path: PathBuf,
    pub recipient: String,
    pub content_kind: ContentKind,
}

/// Performs exactly one multipart POST per request.
///
/// The wrapped `reqwest::Client` is shared process-wide; concurrent attempts
/// ride the same connection pool without cross-talk. Progress and the
/// terminal outcome go out through the per-attempt channel sender.
pub struct UploadExecutor {
    client: Client,
    endpoint: String,
    chunk_size: u64,
}

impl UploadExecutor {
    pub fn new(config: &UploadConfig) -> Result<Self, UploadError> {
        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            chunk_size: config.chunk_size,
        })
    }

    /// Run the attempt to its terminal outcome. Exactly one terminal event
    /// is pushed, after all progress events; errors are never swallowed.
    pub async fn execute(
        &self,
        request: UploadRequest,
        tx: ProgressSender,
        cancel: CancellationToken,
    ) {
        match self.attempt(&request, &tx, &cancel).await {
            Ok(()) => {
                tracing::info!(file = %request.file_path.display(), "upload succeeded");
                tx.send_terminal(UploadOutcome::Succeeded);
            }
            Err(err) => {
                tracing::error!(
                    file = %request.file_path.display(),
                    error = %err,
                    "upload failed"
                );
                tx.send_terminal(UploadOutcome::Failed(err));
            }
        }
    }

    async fn attempt(
        &self,
        request: &UploadRequest,
        tx: &ProgressSender,
        cancel: &CancellationToken,
    ) -> Result<(), UploadError> {
        if request.file_path.as_os_str().is_empty() {
            return Err(UploadError::InvalidInput("empty file path".to_string()));
        }

        // Fail fast before touching the network.
        let metadata = tokio::fs::metadata(&request.file_path)
            .await
            .map_err(|_| UploadError::FileNotFound(request.file_path.clone()))?;
        if !metadata.is_file() {
            return Err(UploadError::FileNotFound(request.file_path.clone()));
        }
        let content_length = metadata.len();

        let file = tokio::fs::File::open(&request.file_path)
            .await
            .map_err(|_| UploadError::FileNotFound(request.file_path.clone()))?;

        let progress_tx = tx.clone();
        let observer: ProgressObserver = Arc::new(move |written, total| {
            progress_tx.send_progress(written as f64 / total as f64);
        });

        let stream = ProgressStream::new(
            ReaderStream::with_capacity(file, self.chunk_size as usize),
            content_length,
            observer,
            cancel.clone(),
        );

        let file_name = request
            .file_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("file")
            .to_string();

        let file_part = Part::stream_with_length(Body::wrap_stream(stream), content_length)
            .file_name(file_name)
            .mime_str(request.content_kind.mime())?;
        let form = Form::new()
            .text("recipient", request.recipient.clone())
            .part("file", file_part);

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|err| classify_send_error(err, cancel))?;

        response.error_for_status()?;
        Ok(())
    }
}

/// Split request failures into the taxonomy: cancellation wins, a body
/// error surfaces the underlying read failure, everything else is network.
fn classify_send_error(err: reqwest::Error, cancel: &CancellationToken) -> UploadError {
    if cancel.is_cancelled() {
        return UploadError::Cancelled;
    }
    if err.is_body() {
        let mut source = std::error::Error::source(&err);
        while let Some(cause) = source {
            if let Some(io) = cause.downcast_ref::<std::io::Error>() {
                return UploadError::Io(std::io::Error::new(io.kind(), io.to_string()));
            }
            source = cause.source();
        }
    }
    UploadError::Network(err)
}
