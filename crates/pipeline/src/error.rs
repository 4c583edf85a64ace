//! Error types for upload pipeline operations.

use thiserror::Error;

/// Errors that can occur while uploading a file.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("pipeline is not running")]
    NotRunning,

    #[error("pipeline is already running")]
    AlreadyRunning,

    #[error("pipeline has already been stopped")]
    AlreadyStopped,

    #[error("session already started")]
    SessionAlreadyStarted,

    #[error("session not started")]
    SessionNotStarted,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upload rejected with status {status}")]
    HttpStatus { status: u16 },

    #[error("chunk {chunk_id} failed to upload: {source}")]
    ChunkFailed {
        chunk_id: u64,
        source: Box<UploadError>,
    },

    #[error("no pre-signed URLs available")]
    NoUrlsAvailable,

    #[error("session error: {0}")]
    Session(String),

    #[error("URL batch error: {0}")]
    UrlBatch(String),

    #[error("upload cancelled")]
    Cancelled,

    #[error("worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Transfer(#[from] uplift_transfer::TransferError),
}

impl UploadError {
    /// Whether another upload attempt is worth making.
    ///
    /// Transport failures and non-2xx responses are retryable;
    /// cancellation and protocol errors are terminal.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Http(_) | Self::HttpStatus { .. })
    }
}
