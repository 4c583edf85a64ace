//! Upload session API client.

use tracing::debug;
use uplift_protocol::constants::SESSIONS_PATH;
use uplift_protocol::messages::{
    PreSignedUrl, PreSignedUrlRequest, StartSessionRequest, StartSessionResponse,
};
use uuid::Uuid;

use crate::{ClientError, TokenClient};

/// Client for the upload session endpoints.
///
/// Every call authenticates with a bearer token for the configured
/// impersonated user.
pub struct SessionClient {
    http: reqwest::Client,
    assets_host: String,
    tokens: TokenClient,
    user: String,
}

impl SessionClient {
    /// Creates a session client against `assets_host`.
    pub fn new(
        http: reqwest::Client,
        assets_host: impl Into<String>,
        tokens: TokenClient,
        user: impl Into<String>,
    ) -> Self {
        Self {
            http,
            assets_host: assets_host.into(),
            tokens,
            user: user.into(),
        }
    }

    /// Starts an upload session for `file_name` and returns its id.
    pub async fn start_session(&self, file_name: &str, intent: &str) -> Result<Uuid, ClientError> {
        let token = self.tokens.access_token(&self.user).await?;
        let url = format!("{}/start", self.sessions_url());
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&token)
            .json(&StartSessionRequest {
                file_name: file_name.to_string(),
                intent: intent.to_string(),
                send_notification: false,
            })
            .send()
            .await?;

        let resp = check_status(resp).await?;
        let session: StartSessionResponse = resp.json().await?;
        debug!(session = %session.session_id, "upload session started");
        Ok(session.session_id)
    }

    /// Requests a batch of pre-signed URLs for `session_id`, starting at
    /// `segment_start`. The service may return fewer than
    /// `segment_count` URLs near the end of the file.
    pub async fn get_urls(
        &self,
        segment_start: u64,
        segment_count: u64,
        session_id: Uuid,
    ) -> Result<Vec<PreSignedUrl>, ClientError> {
        let token = self.tokens.access_token(&self.user).await?;
        let url = format!("{}/{session_id}/urls", self.sessions_url());
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&token)
            .json(&PreSignedUrlRequest {
                segment_start,
                segment_count,
                session_id,
            })
            .send()
            .await?;

        let resp = check_status(resp).await?;
        Ok(resp.json().await?)
    }

    /// Marks `session_id` complete on the server.
    pub async fn complete_session(&self, session_id: Uuid) -> Result<(), ClientError> {
        let token = self.tokens.access_token(&self.user).await?;
        let url = format!("{}/{session_id}/complete", self.sessions_url());
        let resp = self.http.put(&url).bearer_auth(&token).send().await?;
        check_status(resp).await?;
        debug!(session = %session_id, "upload session completed");
        Ok(())
    }

    fn sessions_url(&self) -> String {
        format!("{}/{}", self.assets_host.trim_end_matches('/'), SESSIONS_PATH)
    }
}

/// Maps non-success responses to [`ClientError::Api`].
async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = resp.status();
    if status.is_success() {
        Ok(resp)
    } else {
        let body = resp.text().await.unwrap_or_default();
        Err(ClientError::Api {
            status: status.as_u16(),
            body,
        })
    }
}
