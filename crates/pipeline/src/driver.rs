//! End-to-end upload run for a single file.

use std::path::Path;
use std::time::Instant;

use tokio::task;
use tracing::{error, info};
use uuid::Uuid;

use uplift_transfer::ChunkReader;

use crate::error::UploadError;
use crate::pipeline::UploadPipeline;
use crate::session::SessionLifecycle;
use crate::types::{ChunkItem, UploadReport};

/// Uploads one file through the pipeline under a fresh session.
///
/// Starts the session, streams the file into the pipeline chunk by
/// chunk, drains the pipeline, and ends the session. The session is
/// only ended after a fully successful drain; a failed run leaves it
/// open and surfaces the first error.
pub async fn run_upload(
    pipeline: &UploadPipeline,
    lifecycle: &SessionLifecycle,
    path: &Path,
) -> Result<UploadReport, UploadError> {
    let started = Instant::now();
    info!(file = %path.display(), "starting upload");

    let chunk_size = pipeline.options().chunk_size;
    let open_path = path.to_path_buf();
    let reader = task::spawn_blocking(move || ChunkReader::new(&open_path, chunk_size)).await??;

    let total_chunks = reader.total_chunks();
    info!(
        bytes = reader.file_size(),
        chunks = total_chunks,
        chunk_size,
        "calculated chunks"
    );

    let session_id = lifecycle.start().await?;
    pipeline.start(session_id).await?;

    let queued = queue_chunks(pipeline, reader, session_id, total_chunks).await;
    let drained = pipeline.stop().await;

    let result = match queued.and(drained) {
        Ok(()) => lifecycle.stop().await,
        Err(err) => Err(err),
    };
    let elapsed = started.elapsed();

    match result {
        Ok(()) => {
            let report = UploadReport {
                session_id,
                total_chunks,
                bytes_sent: pipeline.bytes_sent(),
                elapsed,
            };
            info!(
                chunks = report.total_chunks,
                bytes = report.bytes_sent,
                elapsed_ms = elapsed.as_millis() as u64,
                "upload completed"
            );
            Ok(report)
        }
        Err(err) => {
            error!(
                error = %err,
                elapsed_ms = elapsed.as_millis() as u64,
                "upload failed"
            );
            Err(err)
        }
    }
}

/// Reads chunks sequentially and feeds them to the pipeline. File
/// reads run on the blocking pool so the workers are never starved.
///
/// Stops early when the run is cancelled; the cause is reported by
/// `UploadPipeline::stop`, not here.
async fn queue_chunks(
    pipeline: &UploadPipeline,
    mut reader: ChunkReader,
    session_id: Uuid,
    total_chunks: u64,
) -> Result<(), UploadError> {
    loop {
        let (returned, next) = task::spawn_blocking(move || {
            let mut reader = reader;
            let next = reader.next_chunk();
            (reader, next)
        })
        .await?;
        reader = returned;

        let Some(chunk) = next? else {
            break;
        };
        let chunk_id = chunk.chunk_id;
        info!(chunk = chunk_id, total = total_chunks, "processing chunk");

        let item = ChunkItem {
            session_id,
            chunk_id,
            byte_count: chunk.byte_count,
            payload: chunk.data,
            upload_url: None,
        };
        match pipeline.enqueue(item).await {
            Ok(()) => {}
            Err(UploadError::Cancelled) => return Ok(()),
            Err(err) => return Err(err),
        }
        info!(
            chunk = chunk_id,
            remaining = total_chunks - chunk_id,
            "chunk queued"
        );
    }

    info!(chunks = total_chunks, "all chunks queued");
    Ok(())
}
