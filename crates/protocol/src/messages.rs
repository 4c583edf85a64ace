use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Session endpoints
// ---------------------------------------------------------------------------

/// Request body for `POST api/v5/upload/sessions/start`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionRequest {
    pub file_name: String,
    pub intent: String,
    pub send_notification: bool,
}

/// Response body from the session start endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionResponse {
    pub session_id: Uuid,
}

/// Request body for `POST api/v5/upload/sessions/{id}/urls`.
///
/// `segment_start` is the zero-based index of the first segment the batch
/// should cover. The service may return fewer than `segment_count` URLs
/// near the end of the file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreSignedUrlRequest {
    pub segment_start: u64,
    pub segment_count: u64,
    pub session_id: Uuid,
}

/// One single-use upload URL covering one segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreSignedUrl {
    pub segment: u64,
    pub url: String,
}

// ---------------------------------------------------------------------------
// Token endpoint
// ---------------------------------------------------------------------------

/// Form body for `POST connect/token`.
///
/// Field names are the literal form keys the endpoint expects, so no
/// rename is applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenRequest<'a> {
    pub client_id: &'a str,
    pub client_secret: &'a str,
    pub grant_type: &'a str,
    pub scope: &'a str,
    pub impersonate_user: &'a str,
}

/// Response body from the token endpoint. Standard OAuth snake_case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: u64,
}
