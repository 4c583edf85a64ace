//! HTTP clients for the authentication and upload session APIs.
//!
//! [`TokenClient`] fetches and caches OAuth access tokens;
//! [`SessionClient`] drives the upload session endpoints with bearer
//! authentication. Both share a caller-provided `reqwest::Client` so
//! the HTTP timeout is configured in one place.

mod session;
mod token;

pub use session::SessionClient;
pub use token::TokenClient;

/// Errors from the session and token clients.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },
}
