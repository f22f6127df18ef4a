//! Single-slot progress channel with latest-value backpressure.
//!
//! The producer (upload executor) emits progress ratios far faster than the
//! consumer (notifier pump) may be able to handle them. Instead of buffering
//! or blocking, a progress value that has not been consumed yet is simply
//! replaced by the next one. Terminal outcomes are exempt from that policy:
//! they are stored in their own slot and always delivered, after whatever
//! progress value is still pending.
//!
//! Dropping the receiver stops delivery to the consumer but does nothing to
//! the producer: sends into a consumer-less channel succeed silently, so the
//! network attempt runs to completion regardless.

use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Notify;

use crate::errors::UploadError;

/// One event in an upload attempt's sequence: zero or more `Progress`
/// values followed by exactly one `Succeeded` or `Failed`.
#[derive(Debug)]
pub enum UploadOutcome {
    /// bytes_written / content_length, in `[0.0, 1.0]`.
    Progress(f64),
    Succeeded,
    Failed(UploadError),
}

impl UploadOutcome {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, UploadOutcome::Progress(_))
    }
}

#[derive(Default)]
struct Slot {
    /// Latest unconsumed progress ratio. Overwritten, never queued.
    pending: Option<f64>,
    /// Terminal outcome, set at most once.
    terminal: Option<UploadOutcome>,
    /// True once the terminal has been handed to the receiver.
    terminal_taken: bool,
}

struct Shared {
    slot: Mutex<Slot>,
    notify: Notify,
    senders: AtomicUsize,
}

/// Producer half. Cloneable so the body observer and the executor can both
/// hold it within a single attempt; sends never block.
pub struct ProgressSender {
    shared: Arc<Shared>,
}

/// Consumer half. Exactly one per attempt.
pub struct ProgressReceiver {
    shared: Arc<Shared>,
}

/// Create a fresh channel for one upload attempt. Channels are never reused
/// across attempts.
pub fn progress_channel() -> (ProgressSender, ProgressReceiver) {
    let shared = Arc::new(Shared {
        slot: Mutex::new(Slot::default()),
        notify: Notify::new(),
        senders: AtomicUsize::new(1),
    });
    (
        ProgressSender {
            shared: shared.clone(),
        },
        ProgressReceiver { shared },
    )
}

impl ProgressSender {
    /// Publish a progress ratio, replacing any value the consumer has not
    /// picked up yet. Ignored once a terminal outcome has been sent.
    pub fn send_progress(&self, ratio: f64) {
        let mut slot = self.shared.slot.lock().unwrap();
        if slot.terminal.is_some() || slot.terminal_taken {
            return;
        }
        slot.pending = Some(ratio);
        drop(slot);
        self.shared.notify.notify_one();
    }

    /// Publish the terminal outcome. The first terminal wins; later calls
    /// are ignored. A still-pending progress value is delivered first.
    pub fn send_terminal(&self, outcome: UploadOutcome) {
        debug_assert!(outcome.is_terminal());
        let mut slot = self.shared.slot.lock().unwrap();
        if slot.terminal.is_some() || slot.terminal_taken {
            return;
        }
        slot.terminal = Some(outcome);
        drop(slot);
        self.shared.notify.notify_one();
    }
}

impl Clone for ProgressSender {
    fn clone(&self) -> Self {
        self.shared.senders.fetch_add(1, Ordering::Relaxed);
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl Drop for ProgressSender {
    fn drop(&mut self) {
        if self.shared.senders.fetch_sub(1, Ordering::AcqRel) == 1 {
            // Last sender gone; wake the receiver so it can observe closure.
            self.shared.notify.notify_one();
        }
    }
}

impl ProgressReceiver {
    /// Await the next event. Yields the latest pending progress value, then
    /// the terminal outcome exactly once, then `None` forever. Also yields
    /// `None` if every sender was dropped without a terminal.
    pub async fn recv(&mut self) -> Option<UploadOutcome> {
        loop {
            let notified = self.shared.notify.notified();
            {
                let mut slot = self.shared.slot.lock().unwrap();
                if let Some(ratio) = slot.pending.take() {
                    return Some(UploadOutcome::Progress(ratio));
                }
                if slot.terminal_taken {
                    return None;
                }
                if let Some(outcome) = slot.terminal.take() {
                    slot.terminal_taken = true;
                    return Some(outcome);
                }
                if self.shared.senders.load(Ordering::Acquire) == 0 {
                    return None;
                }
            }
            notified.await;
        }
    }
}
