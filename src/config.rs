//! Configuration schema, defaults, and layered loading.
//!
//! Precedence: defaults < config file < environment
use anyhow::{ensure, Context, Result};
use directories::ProjectDirs;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Upper bound on the body chunk size; larger chunks buy nothing and cost
/// memory per in-flight request.
pub const MAX_BODY_CHUNK_SIZE_BYTES: u64 = 8 * 1024 * 1024;

const DEFAULT_CHUNK_SIZE: u64 = 64 * 1024;
const DEFAULT_TIMEOUT_SECS: u64 = 60;

pub fn config_path() -> PathBuf {
    ProjectDirs::from("", "", "uplift")
        .map(|p| p.config_dir().join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("uplift.toml"))
}

/// Content type of the file part, from a small fixed enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    #[default]
    Image,
    Video,
    Audio,
    Text,
}

impl ContentKind {
    /// Wire MIME string for the multipart file part.
    pub fn mime(&self) -> &'static str {
        match self {
            ContentKind::Image => "image/*",
            ContentKind::Video => "video/*",
            ContentKind::Audio => "audio/*",
            ContentKind::Text => "text/plain",
        }
    }
}

/// Fully resolved upload configuration after all layers merge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Endpoint the multipart POST is sent to.
    pub endpoint: String,
    /// Fixed recipient address carried as the text part.
    pub recipient: String,
    /// Content type policy for the file part.
    pub content_kind: ContentKind,
    /// Whole-request timeout in seconds.
    pub timeout_secs: u64,
    /// Body chunk size in bytes.
    pub chunk_size: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8080/upload".to_string(),
            recipient: "algo@mail.com".to_string(),
            content_kind: ContentKind::Image,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl UploadConfig {
    /// Merge defaults, the config file, and `UPLIFT_`-prefixed environment
    /// variables, then validate.
    pub fn load() -> Result<Self> {
        let config: UploadConfig = Figment::from(Serialized::defaults(UploadConfig::default()))
            .merge(Toml::file(config_path()))
            .merge(Env::prefixed("UPLIFT_"))
            .extract()
            .context("failed to load configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(!self.endpoint.is_empty(), "endpoint must not be empty");
        ensure!(
            self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://"),
            "endpoint must be an http(s) URL: {}",
            self.endpoint
        );
        ensure!(!self.recipient.is_empty(), "recipient must not be empty");
        ensure!(self.timeout_secs > 0, "timeout_secs must be positive");
        ensure!(
            self.chunk_size > 0 && self.chunk_size <= MAX_BODY_CHUNK_SIZE_BYTES,
            "chunk_size must be in 1..={} bytes, got {}",
            MAX_BODY_CHUNK_SIZE_BYTES,
            self.chunk_size
        );
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
