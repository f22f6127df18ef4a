//! Byte-counting stream wrapper for the multipart file part.
//!
//! Sits in the HTTP write path: every chunk the client pulls toward the
//! socket is counted and reported to an observer as
//! `(bytes_so_far, content_length)`. The wrapper never buffers more than one
//! chunk and never mutates the data flowing through it.

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_util::Stream;
use tokio_util::sync::CancellationToken;

/// Callback invoked after each chunk with `(bytes_so_far, content_length)`.
pub type ProgressObserver = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// Stream wrapper that counts bytes as they are pulled into the write path.
///
/// `content_length` must be known up front (taken from file metadata); the
/// final observer call reports `bytes_so_far == content_length`. After an
/// inner error or cancellation no further observer calls are made.
pub struct ProgressStream<S> {
    inner: S,
    bytes_sent: u64,
    content_length: u64,
    observer: ProgressObserver,
    cancel: CancellationToken,
    done: bool,
}

impl<S> ProgressStream<S>
where
    S: Stream<Item = io::Result<Bytes>> + Unpin,
{
    pub fn new(
        inner: S,
        content_length: u64,
        observer: ProgressObserver,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            inner,
            bytes_sent: 0,
            content_length,
            observer,
            cancel,
            done: false,
        }
    }
}

impl<S> Stream for ProgressStream<S>
where
    S: Stream<Item = io::Result<Bytes>> + Unpin,
{
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if this.done {
            return Poll::Ready(None);
        }

        // Eager abort between chunks: an in-flight chunk always completes,
        // the next one does not start.
        if this.cancel.is_cancelled() {
            this.done = true;
            return Poll::Ready(Some(Err(io::Error::new(
                io::ErrorKind::Interrupted,
                "upload cancelled",
            ))));
        }

        match Pin::new(&mut this.inner).poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                this.bytes_sent += chunk.len() as u64;
                (this.observer)(this.bytes_sent, this.content_length);
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(Some(Err(err))) => {
                this.done = true;
                Poll::Ready(Some(Err(err)))
            }
            Poll::Ready(None) => {
                this.done = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
