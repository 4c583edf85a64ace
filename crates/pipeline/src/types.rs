//! Data types for the upload pipeline.

use std::time::Duration;

use uuid::Uuid;

use uplift_protocol::constants::{
    DEFAULT_CHUNK_SIZE, DEFAULT_MAX_RETRIES, DEFAULT_QUEUE_CAPACITY, DEFAULT_SEGMENT_BATCH_SIZE,
};

/// A single file chunk queued for upload.
///
/// Owned by exactly one worker after dequeue. The upload URL is filled
/// in by the worker right before the PUT.
#[derive(Debug, Clone)]
pub struct ChunkItem {
    pub session_id: Uuid,
    /// 1-based position of the chunk within the file.
    pub chunk_id: u64,
    pub payload: Vec<u8>,
    /// Number of valid bytes at the front of `payload`.
    pub byte_count: usize,
    pub upload_url: Option<String>,
}

/// Tuning knobs for an upload run.
#[derive(Debug, Clone)]
pub struct UploadOptions {
    /// Bytes per chunk. The last chunk of a file may be shorter.
    pub chunk_size: usize,
    /// How many pre-signed URLs to request per batch fetch.
    pub segment_batch_size: u64,
    /// Retries per chunk after the initial attempt.
    pub max_retries: u32,
    /// Bounded queue capacity between the producer and the workers.
    pub queue_capacity: usize,
    /// Number of concurrent upload workers.
    pub worker_count: usize,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            segment_batch_size: DEFAULT_SEGMENT_BATCH_SIZE,
            max_retries: DEFAULT_MAX_RETRIES,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            worker_count: default_worker_count(),
        }
    }
}

/// One worker per available core, matching the upload's CPU-light,
/// network-bound profile.
pub fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1)
}

/// Summary of a finished upload run.
#[derive(Debug, Clone)]
pub struct UploadReport {
    pub session_id: Uuid,
    pub total_chunks: u64,
    pub bytes_sent: u64,
    pub elapsed: Duration,
}
