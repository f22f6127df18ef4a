pub mod body;
pub mod channel;
pub mod config;
pub mod errors;
pub mod executor;
pub mod notifier;
pub mod service;

pub use channel::{progress_channel, ProgressReceiver, ProgressSender, UploadOutcome};
pub use config::{ContentKind, UploadConfig};
pub use errors::UploadError;
pub use executor::{UploadExecutor, UploadRequest};
pub use notifier::{EventBus, Notifier, STATUS_CHANNEL};
pub use service::{UploadJob, UploadService};
