//! Sequential chunked file reading.
//!
//! Splits a local file into fixed-size numbered chunks that the upload
//! pipeline sends to pre-signed segment URLs. Reading is synchronous;
//! async callers drive the reader through `spawn_blocking`.

mod chunked;

pub use chunked::{ChunkReader, FileChunk, total_chunks};

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
