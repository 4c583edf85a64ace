//! Concurrent chunk upload pipeline.
//!
//! # Pipeline
//!
//! An upload run moves through these stages:
//!
//! 1. Start a remote upload session.
//! 2. Read the file as fixed-size chunks.
//! 3. Queue each chunk into a bounded worker pool.
//! 4. Workers draw pre-signed URLs from a prefetching cache and PUT
//!    each chunk, retrying transient failures with exponential
//!    backoff.
//! 5. Drain the queue and end the session.
//!
//! The first terminal failure cancels the run: in-flight attempts
//! finish, queued work is discarded, and the error surfaces from
//! `UploadPipeline::stop`.

pub mod driver;
pub mod error;
pub mod pipeline;
pub mod retry;
pub mod session;
pub mod types;
pub mod url_cache;

pub use driver::run_upload;
pub use error::UploadError;
pub use pipeline::UploadPipeline;
pub use retry::RetryPolicy;
pub use session::{SessionLifecycle, SessionService};
pub use types::{ChunkItem, UploadOptions, UploadReport, default_worker_count};
pub use url_cache::{UrlBatchService, UrlCache};
