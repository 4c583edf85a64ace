//! Bounded-concurrency upload worker pool.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::error::UploadError;
use crate::retry::RetryPolicy;
use crate::types::{ChunkItem, UploadOptions};
use crate::url_cache::{UrlBatchService, UrlCache};

enum State {
    Idle,
    Running {
        tx: mpsc::Sender<ChunkItem>,
        workers: Vec<JoinHandle<()>>,
    },
    Stopped,
}

/// Uploads queued chunks through a fixed pool of workers.
///
/// The queue between the producer and the pool is bounded, so a slow
/// network applies backpressure to the file reader. The first chunk
/// that fails terminally cancels the whole run; workers stop taking
/// new items and `stop` reports the failure once everything has wound
/// down. A pipeline drives exactly one run: start, enqueue, stop.
pub struct UploadPipeline {
    options: UploadOptions,
    cache: Arc<UrlCache>,
    http: reqwest::Client,
    retry: RetryPolicy,
    cancel: CancellationToken,
    state: Mutex<State>,
    first_error: Arc<Mutex<Option<UploadError>>>,
    chunks_uploaded: Arc<AtomicU64>,
    bytes_sent: Arc<AtomicU64>,
}

impl UploadPipeline {
    pub fn new(
        options: UploadOptions,
        http: reqwest::Client,
        urls: Arc<dyn UrlBatchService>,
    ) -> Self {
        let cache = Arc::new(UrlCache::new(urls, options.segment_batch_size));
        let retry = RetryPolicy::new(options.max_retries);
        Self {
            options,
            cache,
            http,
            retry,
            cancel: CancellationToken::new(),
            state: Mutex::new(State::Idle),
            first_error: Arc::new(Mutex::new(None)),
            chunks_uploaded: Arc::new(AtomicU64::new(0)),
            bytes_sent: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn options(&self) -> &UploadOptions {
        &self.options
    }

    /// Cancelled when the run aborts; cancel it to abort the run.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn chunks_uploaded(&self) -> u64 {
        self.chunks_uploaded.load(Ordering::Relaxed)
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent.load(Ordering::Relaxed)
    }

    /// Spawns the worker pool. Fails if the pipeline already ran.
    pub async fn start(&self, session_id: Uuid) -> Result<(), UploadError> {
        let mut state = self.state.lock().await;
        match *state {
            State::Idle => {}
            State::Running { .. } => return Err(UploadError::AlreadyRunning),
            State::Stopped => return Err(UploadError::AlreadyStopped),
        }

        let (tx, rx) = mpsc::channel(self.options.queue_capacity.max(1));
        let rx = Arc::new(Mutex::new(rx));
        let worker_count = self.options.worker_count.max(1);
        let mut workers = Vec::with_capacity(worker_count);
        for id in 0..worker_count {
            let worker = Worker {
                id,
                cache: Arc::clone(&self.cache),
                http: self.http.clone(),
                retry: self.retry.clone(),
                cancel: self.cancel.clone(),
                first_error: Arc::clone(&self.first_error),
                chunks_uploaded: Arc::clone(&self.chunks_uploaded),
                bytes_sent: Arc::clone(&self.bytes_sent),
            };
            workers.push(tokio::spawn(worker.run(Arc::clone(&rx))));
        }

        info!(session = %session_id, workers = worker_count, "upload pipeline started");
        *state = State::Running { tx, workers };
        Ok(())
    }

    /// Queues one chunk, waiting while the queue is at capacity.
    pub async fn enqueue(&self, item: ChunkItem) -> Result<(), UploadError> {
        let tx = {
            let state = self.state.lock().await;
            match &*state {
                State::Running { tx, .. } => tx.clone(),
                State::Idle => return Err(UploadError::NotRunning),
                State::Stopped => return Err(UploadError::AlreadyStopped),
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(UploadError::Cancelled),
            sent = tx.send(item) => sent.map_err(|_| UploadError::AlreadyStopped),
        }
    }

    /// Closes the queue, waits for queued and in-flight chunks to
    /// reach a terminal state, and surfaces the first recorded
    /// failure.
    pub async fn stop(&self) -> Result<(), UploadError> {
        let workers = {
            let mut state = self.state.lock().await;
            match std::mem::replace(&mut *state, State::Stopped) {
                State::Running { tx, workers } => {
                    drop(tx);
                    workers
                }
                State::Idle => {
                    *state = State::Idle;
                    return Err(UploadError::NotRunning);
                }
                State::Stopped => return Err(UploadError::AlreadyStopped),
            }
        };

        for worker in workers {
            worker.await?;
        }

        if let Some(err) = self.first_error.lock().await.take() {
            return Err(err);
        }
        if self.cancel.is_cancelled() {
            return Err(UploadError::Cancelled);
        }

        info!(
            chunks = self.chunks_uploaded(),
            bytes = self.bytes_sent(),
            "upload pipeline drained"
        );
        Ok(())
    }
}

/// One member of the upload pool.
struct Worker {
    id: usize,
    cache: Arc<UrlCache>,
    http: reqwest::Client,
    retry: RetryPolicy,
    cancel: CancellationToken,
    first_error: Arc<Mutex<Option<UploadError>>>,
    chunks_uploaded: Arc<AtomicU64>,
    bytes_sent: Arc<AtomicU64>,
}

impl Worker {
    async fn run(self, rx: Arc<Mutex<mpsc::Receiver<ChunkItem>>>) {
        loop {
            // Receive outside of processing so other workers can pull
            // items while this one uploads.
            let item = {
                let mut rx = rx.lock().await;
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => None,
                    item = rx.recv() => item,
                }
            };
            let Some(item) = item else { break };
            self.process(item).await;
        }
        debug!(worker = self.id, "upload worker stopped");
    }

    async fn process(&self, mut item: ChunkItem) {
        let chunk_id = item.chunk_id;
        info!(chunk = chunk_id, bytes = item.byte_count, "uploading chunk");
        match self.upload(&mut item).await {
            Ok(status) => {
                self.chunks_uploaded.fetch_add(1, Ordering::Relaxed);
                self.bytes_sent
                    .fetch_add(item.byte_count as u64, Ordering::Relaxed);
                info!(chunk = chunk_id, status, "uploaded chunk");
            }
            Err(err) => {
                error!(chunk = chunk_id, error = %err, "chunk upload failed");
                self.record_failure(err).await;
            }
        }
    }

    async fn upload(&self, item: &mut ChunkItem) -> Result<u16, UploadError> {
        if self.cancel.is_cancelled() {
            return Err(UploadError::Cancelled);
        }

        let chunk_id = item.chunk_id;
        let url = self.cache.get_url(item.session_id).await?;
        item.upload_url = Some(url.clone());
        let payload = &item.payload[..item.byte_count];

        self.retry
            .run(&self.cancel, || self.put_payload(&url, payload))
            .await
            .map_err(|err| match err {
                UploadError::Cancelled => UploadError::Cancelled,
                other => UploadError::ChunkFailed {
                    chunk_id,
                    source: Box::new(other),
                },
            })
    }

    async fn put_payload(&self, url: &str, payload: &[u8]) -> Result<u16, UploadError> {
        let response = self.http.put(url).body(payload.to_vec()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(UploadError::HttpStatus {
                status: status.as_u16(),
            });
        }
        Ok(status.as_u16())
    }

    /// Records the first failure of the run and cancels all other
    /// work. Later failures are dropped; they are consequences of the
    /// first.
    async fn record_failure(&self, err: UploadError) {
        let mut slot = self.first_error.lock().await;
        if slot.is_none() {
            *slot = Some(err);
            self.cancel.cancel();
        }
    }
}
