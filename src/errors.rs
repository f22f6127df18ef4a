//! Error taxonomy for a single upload attempt.

use std::path::PathBuf;

use thiserror::Error;

/// Everything that can terminate an upload attempt with a failure.
///
/// One attempt, one terminal outcome. The display text of these variants is
/// what reaches broadcast listeners; the full chain goes to the log.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("invalid upload request: {0}")]
    InvalidInput(String),

    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("i/o error while reading source file: {0}")]
    Io(#[from] std::io::Error),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("upload cancelled")]
    Cancelled,
}
