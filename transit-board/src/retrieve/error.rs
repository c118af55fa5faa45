//! Retrieval error types.

use crate::transitland::ApiError;

/// Why a paginated retrieval was abandoned.
#[derive(Debug, thiserror::Error)]
pub enum RetrieveError {
    /// The API call for a page failed.
    #[error("request to {endpoint} failed: {source}")]
    Api {
        endpoint: String,
        #[source]
        source: ApiError,
    },

    /// A page came back without the array the retriever consumes.
    #[error("response has no \"{0}\" array")]
    MissingArray(&'static str),
}

impl RetrieveError {
    /// Whether this failure was caused by rate limiting.
    pub fn is_rate_limited(&self) -> bool {
        matches!(
            self,
            RetrieveError::Api {
                source: ApiError::RateLimited,
                ..
            }
        )
    }
}
