//! Error types for OAuth session operations

use api_session::ApiError;

/// Errors from OAuth session operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no OAuth client was specified in the request or session options")]
    MissingClient,

    #[error("callback URL has no authorization code: {0}")]
    InvalidCallback(String),

    #[error("OAuth request returned non-200 HTTP status code: {status}")]
    UnexpectedStatus { status: u16 },

    #[error("no refresh token available")]
    RefreshUnavailable,

    #[error("OAuth session is already complete")]
    AlreadyComplete,

    #[error("invalid token response: {0}")]
    InvalidTokenResponse(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("token request failed: {0}")]
    Api(#[from] ApiError),
}

/// Result alias for OAuth session operations.
pub type Result<T> = std::result::Result<T, Error>;
