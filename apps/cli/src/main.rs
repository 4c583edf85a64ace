//! Uplift command-line entry point.

mod api;
mod config;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use uplift_client::{SessionClient, TokenClient};
use uplift_pipeline::{SessionLifecycle, UploadPipeline, run_upload};

use crate::api::{ApiSessionService, ApiUrlBatchService};
use crate::config::Config;

#[derive(Parser)]
#[command(name = "uplift", version, about = "Uploads a file through a pre-signed segment session")]
struct Args {
    /// File to upload.
    file: PathBuf,

    /// Path to the configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    // Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        file = %args.file.display(),
        "starting uplift"
    );

    let config = Config::load(args.config.as_deref())?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(upload(config, args.file))?;

    tracing::info!("upload finished");
    Ok(())
}

/// Wires the clients, pipeline and session lifecycle, then runs the
/// upload to completion.
async fn upload(config: Config, file: PathBuf) -> anyhow::Result<()> {
    let file_name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| anyhow::anyhow!("{} has no file name", file.display()))?;

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http_timeout_secs))
        .build()?;

    let tokens = TokenClient::new(
        http.clone(),
        config.auth_host.clone(),
        config.client_id.clone(),
        config.client_secret.clone(),
        config.scope.clone(),
    );
    let session_client = Arc::new(SessionClient::new(
        http.clone(),
        config.assets_host.clone(),
        tokens,
        config.user_name.clone(),
    ));

    let sessions = Arc::new(ApiSessionService::new(
        Arc::clone(&session_client),
        file_name,
        config.intent.clone(),
    ));
    let urls = Arc::new(ApiUrlBatchService::new(session_client));

    let pipeline = UploadPipeline::new(config.upload_options(), http, urls);
    let lifecycle = SessionLifecycle::new(sessions, config.complete_session);

    let report = run_upload(&pipeline, &lifecycle, &file).await?;
    tracing::info!(
        session = %report.session_id,
        chunks = report.total_chunks,
        bytes = report.bytes_sent,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "upload report"
    );
    Ok(())
}
