//! Error types for API requests

/// Errors from API requests.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("API returned non-200 HTTP status code: {0}")]
    Status(u16),

    /// The API answered with an `error` object in the response body.
    #[error("API error {code}: {info}")]
    Api { code: String, info: String },

    #[error("invalid API response: {0}")]
    InvalidResponse(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("invalid header value: {0}")]
    InvalidHeader(String),

    /// Failure raised by a handler decorating the request path.
    #[error(transparent)]
    Middleware(Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
    /// The API error code, if this is an API-level error.
    pub fn code(&self) -> Option<&str> {
        match self {
            ApiError::Api { code, .. } => Some(code),
            _ => None,
        }
    }
}

/// Result alias for API requests.
pub type Result<T> = std::result::Result<T, ApiError>;
