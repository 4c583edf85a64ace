//! Prefetching cache for pre-signed upload URLs.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use uplift_protocol::messages::PreSignedUrl;

use crate::error::UploadError;

/// Source of pre-signed URL batches for a session.
///
/// Implemented over the session API by the CLI; mocked in tests. May
/// return fewer entries than requested near the end of a file.
pub trait UrlBatchService: Send + Sync {
    fn fetch_url_batch(
        &self,
        segment_start: u64,
        segment_count: u64,
        session_id: Uuid,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<PreSignedUrl>, UploadError>> + Send + '_>>;
}

struct CacheState {
    buffer: VecDeque<String>,
    next_segment_start: u64,
}

/// Hands out pre-signed URLs one at a time, fetching them in batches.
///
/// The whole check-refill-dequeue sequence runs under a single lock,
/// so concurrent workers can never double-fetch a batch or receive the
/// same URL twice.
pub struct UrlCache {
    service: Arc<dyn UrlBatchService>,
    batch_size: u64,
    state: Mutex<CacheState>,
}

impl UrlCache {
    pub fn new(service: Arc<dyn UrlBatchService>, batch_size: u64) -> Self {
        Self {
            service,
            batch_size,
            state: Mutex::new(CacheState {
                buffer: VecDeque::new(),
                next_segment_start: 0,
            }),
        }
    }

    /// Returns the next unused URL, refilling the buffer when empty.
    ///
    /// An empty batch while chunks remain means the remote side issued
    /// fewer URLs than the file needs, which is fatal rather than
    /// retryable.
    pub async fn get_url(&self, session_id: Uuid) -> Result<String, UploadError> {
        let mut state = self.state.lock().await;

        if state.buffer.is_empty() {
            let batch = self
                .service
                .fetch_url_batch(state.next_segment_start, self.batch_size, session_id)
                .await?;
            info!(
                segment_start = state.next_segment_start,
                requested = self.batch_size,
                received = batch.len(),
                "fetched pre-signed URL batch"
            );
            state.next_segment_start += batch.len() as u64;
            state.buffer.extend(batch.into_iter().map(|entry| entry.url));
        }

        state.buffer.pop_front().ok_or(UploadError::NoUrlsAvailable)
    }
}
