//! Uploader configuration management.
//!
//! Configuration is stored as TOML, by default at
//! `~/.config/uplift/config.toml` (Linux) or
//! `%APPDATA%/uplift/config.toml` (Windows). The credentials can also
//! be supplied through `UPLIFT_CLIENT_ID`, `UPLIFT_CLIENT_SECRET` and
//! `UPLIFT_USER_NAME`, which override the file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uplift_protocol::constants::{
    DEFAULT_CHUNK_SIZE, DEFAULT_HTTP_TIMEOUT, DEFAULT_INTENT, DEFAULT_MAX_RETRIES,
    DEFAULT_QUEUE_CAPACITY, DEFAULT_SEGMENT_BATCH_SIZE, DEFAULT_TOKEN_SCOPE,
};
use uplift_pipeline::{UploadOptions, default_worker_count};

/// Uploader configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the authentication host.
    pub auth_host: String,

    /// Base URL of the assets/upload host.
    pub assets_host: String,

    /// OAuth client id.
    #[serde(default)]
    pub client_id: String,

    /// OAuth client secret.
    #[serde(default)]
    pub client_secret: String,

    /// User to impersonate when requesting tokens.
    #[serde(default)]
    pub user_name: String,

    /// OAuth scope requested with each token.
    #[serde(default = "default_scope")]
    pub scope: String,

    /// Upload intent sent when starting a session.
    #[serde(default = "default_intent")]
    pub intent: String,

    /// Whether to call the session-complete endpoint after a
    /// successful upload. Completing triggers downstream processing,
    /// so this is off by default.
    #[serde(default)]
    pub complete_session: bool,

    /// Bytes per chunk.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Pre-signed URLs requested per batch.
    #[serde(default = "default_segment_batch_size")]
    pub segment_batch_size: u64,

    /// Retries per chunk after the initial attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Per-request HTTP timeout in seconds.
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    /// Capacity of the queue between the reader and the workers.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Number of concurrent upload workers (0 = one per core).
    #[serde(default)]
    pub worker_count: usize,
}

fn default_scope() -> String {
    DEFAULT_TOKEN_SCOPE.into()
}

fn default_intent() -> String {
    DEFAULT_INTENT.into()
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_segment_batch_size() -> u64 {
    DEFAULT_SEGMENT_BATCH_SIZE
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_http_timeout_secs() -> u64 {
    DEFAULT_HTTP_TIMEOUT.as_secs()
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

impl Config {
    /// Loads configuration from `path`, or from the default location
    /// when no path is given, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => config_path()?,
        };

        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("cannot read config {}: {e}", path.display()))?;
        let mut config: Config = toml::from_str(&content)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Overrides credentials with the `UPLIFT_*` environment variables
    /// when set, so secrets can stay out of the config file.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("UPLIFT_CLIENT_ID") {
            self.client_id = v;
        }
        if let Ok(v) = std::env::var("UPLIFT_CLIENT_SECRET") {
            self.client_secret = v;
        }
        if let Ok(v) = std::env::var("UPLIFT_USER_NAME") {
            self.user_name = v;
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(!self.auth_host.is_empty(), "auth_host is not set");
        anyhow::ensure!(!self.assets_host.is_empty(), "assets_host is not set");
        anyhow::ensure!(!self.client_id.is_empty(), "client_id is not set");
        anyhow::ensure!(!self.client_secret.is_empty(), "client_secret is not set");
        anyhow::ensure!(!self.user_name.is_empty(), "user_name is not set");
        anyhow::ensure!(self.chunk_size > 0, "chunk_size must be positive");
        anyhow::ensure!(self.segment_batch_size > 0, "segment_batch_size must be positive");
        Ok(())
    }

    /// Resolves the pipeline tuning options.
    pub fn upload_options(&self) -> UploadOptions {
        UploadOptions {
            chunk_size: self.chunk_size,
            segment_batch_size: self.segment_batch_size,
            max_retries: self.max_retries,
            queue_capacity: self.queue_capacity,
            worker_count: if self.worker_count == 0 {
                default_worker_count()
            } else {
                self.worker_count
            },
        }
    }
}

/// Returns the platform-specific configuration file path.
fn config_path() -> anyhow::Result<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        Ok(PathBuf::from(appdata).join("uplift").join("config.toml"))
    }

    #[cfg(not(target_os = "windows"))]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        Ok(PathBuf::from(home)
            .join(".config")
            .join("uplift")
            .join("config.toml"))
    }
}
