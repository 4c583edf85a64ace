//! Adapters from the session API client to the pipeline's service
//! traits.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use uplift_client::SessionClient;
use uplift_pipeline::{SessionService, UploadError, UrlBatchService};
use uplift_protocol::messages::PreSignedUrl;
use uuid::Uuid;

/// [`SessionService`] over the remote session API.
///
/// Carries the file name and intent so the pipeline crate never learns
/// about either.
pub struct ApiSessionService {
    client: Arc<SessionClient>,
    file_name: String,
    intent: String,
}

impl ApiSessionService {
    pub fn new(client: Arc<SessionClient>, file_name: String, intent: String) -> Self {
        Self {
            client,
            file_name,
            intent,
        }
    }
}

impl SessionService for ApiSessionService {
    fn start_session(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Uuid, UploadError>> + Send + '_>> {
        Box::pin(async move {
            self.client
                .start_session(&self.file_name, &self.intent)
                .await
                .map_err(|e| UploadError::Session(e.to_string()))
        })
    }

    fn complete_session(
        &self,
        session_id: Uuid,
    ) -> Pin<Box<dyn Future<Output = Result<(), UploadError>> + Send + '_>> {
        Box::pin(async move {
            self.client
                .complete_session(session_id)
                .await
                .map_err(|e| UploadError::Session(e.to_string()))
        })
    }
}

/// [`UrlBatchService`] over the remote session API.
pub struct ApiUrlBatchService {
    client: Arc<SessionClient>,
}

impl ApiUrlBatchService {
    pub fn new(client: Arc<SessionClient>) -> Self {
        Self { client }
    }
}

impl UrlBatchService for ApiUrlBatchService {
    fn fetch_url_batch(
        &self,
        segment_start: u64,
        segment_count: u64,
        session_id: Uuid,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<PreSignedUrl>, UploadError>> + Send + '_>> {
        Box::pin(async move {
            self.client
                .get_urls(segment_start, segment_count, session_id)
                .await
                .map_err(|e| UploadError::UrlBatch(e.to_string()))
        })
    }
}
