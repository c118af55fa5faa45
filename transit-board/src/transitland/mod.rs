//! Transitland REST API access.
//!
//! This module is the boundary between the retrieval pipeline and the
//! network. Each call fetches one page as JSON, prunes it with a
//! [`FieldFilter`], and classifies failures so the retrievers can decide
//! whether to retry (timeouts) or abort (everything else).
//!
//! Key characteristics of transitland:
//! - Every list endpoint is paginated; `meta.next` holds the absolute URL
//!   of the following page and is absent on the last one
//! - An API key is required, sent as the `apikey` header
//! - Timestamps are ISO-8601 UTC strings

mod client;
mod error;
mod filter;
mod mock;

pub use client::{
    ApiCaller, ClientConfig, DEFAULT_BASE_URL, TransitlandClient, parse_document,
    relative_endpoint, resolve_endpoint,
};
pub use error::{ApiError, ApiErrorKind};
pub use filter::{DEFAULT_NESTING_LIMIT, FieldFilter, nesting_depth};
pub use mock::{RecordedCall, ScriptedCaller};
