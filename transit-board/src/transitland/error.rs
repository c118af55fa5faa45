//! Transitland client error types.

/// Errors from a single transitland API call.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request timed out before a response arrived.
    #[error("request timed out")]
    Timeout,

    /// Rate limited by the API (HTTP 429).
    #[error("rate limited by transitland API")]
    RateLimited,

    /// Missing or invalid API key.
    #[error("unauthorized (invalid API key)")]
    Unauthorized,

    /// API returned a non-success status code.
    #[error("API error {status}: {message}")]
    Http { status: u16, message: String },

    /// Response body could not be deserialized.
    #[error("JSON parse error: {message}")]
    Json {
        message: String,
        body: Option<String>,
    },

    /// Connection-level failure (DNS, TLS, reset, ...).
    #[error("HTTP error: {0}")]
    Transport(#[source] reqwest::Error),
}

/// Coarse classification of an [`ApiError`], used by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// Retried in place.
    Timeout,
    /// Aborts the retrieval and raises the rate-limit indicator.
    RateLimited,
    /// Any other transport or status failure.
    Http,
    /// Body was not a usable JSON document.
    Deserialize,
}

impl ApiError {
    /// Classify this error.
    pub fn kind(&self) -> ApiErrorKind {
        match self {
            ApiError::Timeout => ApiErrorKind::Timeout,
            ApiError::RateLimited => ApiErrorKind::RateLimited,
            ApiError::Json { .. } => ApiErrorKind::Deserialize,
            ApiError::Unauthorized | ApiError::Http { .. } | ApiError::Transport(_) => {
                ApiErrorKind::Http
            }
        }
    }

    /// HTTP status code associated with this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::RateLimited => Some(429),
            ApiError::Unauthorized => Some(401),
            ApiError::Http { status, .. } => Some(*status),
            ApiError::Transport(e) => e.status().map(|s| s.as_u16()),
            ApiError::Timeout | ApiError::Json { .. } => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else {
            ApiError::Transport(err)
        }
    }
}
