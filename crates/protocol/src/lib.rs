pub mod constants;
pub mod messages;

// Re-export primary types for convenience.
pub use messages::{
    PreSignedUrl, PreSignedUrlRequest, StartSessionRequest, StartSessionResponse, TokenRequest,
    TokenResponse,
};
