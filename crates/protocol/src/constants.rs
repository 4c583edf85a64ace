use std::time::Duration;

/// Base path for session endpoints. Start, URL batch and complete
/// endpoints all hang off this path.
pub const SESSIONS_PATH: &str = "api/v5/upload/sessions";

/// Token endpoint path on the authentication host.
pub const TOKEN_PATH: &str = "connect/token";

/// OAuth grant type used by the token endpoint.
pub const IMPERSONATION_GRANT_TYPE: &str = "impersonation";

/// Default OAuth scope requested with a token.
pub const DEFAULT_TOKEN_SCOPE: &str = "openid profile";

/// Default upload intent sent when starting a session.
pub const DEFAULT_INTENT: &str = "CsvImport";

/// Size of one file chunk / remote segment (5 MB).
pub const DEFAULT_CHUNK_SIZE: usize = 5 * 1024 * 1024;

/// How many pre-signed URLs to request per batch.
///
/// Each URL covers exactly one segment, so this is the number of chunks
/// that can be uploaded between two round-trips to the session API.
/// Increase for very large files.
pub const DEFAULT_SEGMENT_BATCH_SIZE: u64 = 1000;

/// How many times a failed chunk upload is retried before the whole
/// upload is abandoned.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Client-side timeout for a single HTTP request.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Capacity of the chunk queue between the file reader and the upload
/// workers. Independent of the worker count; bounds how far the reader
/// can run ahead of the uploads.
pub const DEFAULT_QUEUE_CAPACITY: usize = 10;

/// Safety margin subtracted from a token's lifetime before it is
/// considered expired and fetched again.
pub const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(30);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_chunk_size() {
        assert_eq!(DEFAULT_CHUNK_SIZE, 5_242_880);
    }

    #[test]
    fn refresh_margin_below_timeout() {
        assert!(TOKEN_REFRESH_MARGIN <= DEFAULT_HTTP_TIMEOUT);
    }
}
