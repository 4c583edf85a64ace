//! OAuth token acquisition with per-user caching.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::debug;
use uplift_protocol::constants::{IMPERSONATION_GRANT_TYPE, TOKEN_PATH, TOKEN_REFRESH_MARGIN};
use uplift_protocol::messages::{TokenRequest, TokenResponse};

use crate::ClientError;

struct CachedToken {
    token: String,
    expires_at: Instant,
}

/// Fetches access tokens from the authentication host.
///
/// Tokens are cached per impersonated user and reused until
/// [`TOKEN_REFRESH_MARGIN`] before they expire. The cache lock is held
/// across the fetch, so concurrent callers never race a refresh.
pub struct TokenClient {
    http: reqwest::Client,
    auth_host: String,
    client_id: String,
    client_secret: String,
    scope: String,
    cache: Mutex<HashMap<String, CachedToken>>,
}

impl TokenClient {
    /// Creates a token client against `auth_host`.
    pub fn new(
        http: reqwest::Client,
        auth_host: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        scope: impl Into<String>,
    ) -> Self {
        Self {
            http,
            auth_host: auth_host.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            scope: scope.into(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Returns a valid access token for `user`, fetching a fresh one if
    /// the cached token is missing or about to expire.
    pub async fn access_token(&self, user: &str) -> Result<String, ClientError> {
        let mut cache = self.cache.lock().await;
        if let Some(cached) = cache.get(user) {
            if cached.expires_at > Instant::now() {
                return Ok(cached.token.clone());
            }
        }

        debug!(user, "fetching access token");
        let url = format!("{}/{}", self.auth_host.trim_end_matches('/'), TOKEN_PATH);
        let resp = self
            .http
            .post(&url)
            .form(&TokenRequest {
                client_id: &self.client_id,
                client_secret: &self.client_secret,
                grant_type: IMPERSONATION_GRANT_TYPE,
                scope: &self.scope,
                impersonate_user: user,
            })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let token: TokenResponse = resp.json().await?;
        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_REFRESH_MARGIN);
        cache.insert(
            user.to_string(),
            CachedToken {
                token: token.access_token.clone(),
                expires_at: Instant::now() + lifetime,
            },
        );

        Ok(token.access_token)
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    /// Starts a mock HTTP server that answers each connection with the
    /// next body in `bodies`, then returns the first captured request.
    async fn mock_token_server(
        bodies: Vec<String>,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let url = format!("http://127.0.0.1:{port}");

        let handle = tokio::spawn(async move {
            let mut first_request = String::new();
            for body in bodies {
                let Ok((mut stream, _)) = listener.accept().await else {
                    break;
                };
                let mut buf = vec![0u8; 8192];
                let n = stream.read(&mut buf).await.unwrap_or(0);
                if first_request.is_empty() {
                    first_request = String::from_utf8_lossy(&buf[..n]).into_owned();
                }

                let resp = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = stream.write_all(resp.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
            first_request
        });

        (url, handle)
    }

    /// Starts a mock HTTP server that responds with an error status.
    async fn mock_server_error(status: u16, body: &str) -> (String, tokio::task::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let url = format!("http://127.0.0.1:{port}");
        let body = body.to_string();

        let handle = tokio::spawn(async move {
            if let Ok((mut stream, _)) = listener.accept().await {
                let mut buf = vec![0u8; 8192];
                let _ = stream.read(&mut buf).await;

                let resp = format!(
                    "HTTP/1.1 {status} Error\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = stream.write_all(resp.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });

        (url, handle)
    }

    fn client_for(url: String) -> TokenClient {
        TokenClient::new(
            reqwest::Client::new(),
            url,
            "client-id",
            "client-secret",
            "openid profile",
        )
    }

    #[tokio::test]
    async fn access_token_fetched_and_cached() {
        let body = r#"{"access_token":"t1","expires_in":3600}"#.to_string();
        let (url, handle) = mock_token_server(vec![body]).await;

        let tokens = client_for(url);
        let first = tokens.access_token("user@example.com").await.unwrap();
        assert_eq!(first, "t1");

        // Second call must come from the cache; the server only accepts
        // one connection.
        let second = tokens.access_token("user@example.com").await.unwrap();
        assert_eq!(second, "t1");

        let request = handle.await.unwrap();
        assert!(request.contains("POST /connect/token"));
        assert!(request.contains("grant_type=impersonation"));
        assert!(request.contains("impersonate_user=user%40example.com"));
    }

    #[tokio::test]
    async fn access_token_refetched_after_expiry() {
        // expires_in below the refresh margin, so the cached entry is
        // expired immediately.
        let bodies = vec![
            r#"{"access_token":"t1","expires_in":10}"#.to_string(),
            r#"{"access_token":"t2","expires_in":3600}"#.to_string(),
        ];
        let (url, handle) = mock_token_server(bodies).await;

        let tokens = client_for(url);
        assert_eq!(tokens.access_token("user").await.unwrap(), "t1");
        assert_eq!(tokens.access_token("user").await.unwrap(), "t2");

        handle.abort();
    }

    #[tokio::test]
    async fn access_token_cached_per_user() {
        let bodies = vec![
            r#"{"access_token":"alice-token","expires_in":3600}"#.to_string(),
            r#"{"access_token":"bob-token","expires_in":3600}"#.to_string(),
        ];
        let (url, handle) = mock_token_server(bodies).await;

        let tokens = client_for(url);
        assert_eq!(tokens.access_token("alice").await.unwrap(), "alice-token");
        assert_eq!(tokens.access_token("bob").await.unwrap(), "bob-token");
        assert_eq!(tokens.access_token("alice").await.unwrap(), "alice-token");

        handle.abort();
    }

    #[tokio::test]
    async fn access_token_error_status() {
        let (url, handle) = mock_server_error(400, r#"{"error":"invalid_client"}"#).await;

        let tokens = client_for(url);
        let err = tokens.access_token("user").await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("400"), "error should mention 400: {msg}");

        handle.abort();
    }
}
