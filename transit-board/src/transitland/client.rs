//! Transitland REST HTTP client.
//!
//! Issues one filtered JSON request per call. Pagination, retries and
//! parsing live in the retrievers; this layer only knows about transport.

use std::future::Future;

use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::Value;
use tracing::{debug, trace};

use super::error::ApiError;
use super::filter::{FieldFilter, nesting_depth};

/// Default base URL for the transitland API.
pub const DEFAULT_BASE_URL: &str = "https://transit.land";

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Interface the retrievers use to talk to the API.
///
/// This abstraction allows the retrieval pipeline to be tested with
/// scripted responses.
pub trait ApiCaller: Send + Sync {
    /// Fetch `endpoint`, prune the response with `filter`, and reject documents
    /// nested deeper than `nesting_limit`.
    ///
    /// `endpoint` is either a path relative to the API base URL or an absolute
    /// URL (as returned in pagination metadata).
    fn call(
        &self,
        endpoint: &str,
        filter: &FieldFilter,
        nesting_limit: usize,
        attach_api_key: bool,
    ) -> impl Future<Output = Result<Value, ApiError>> + Send;
}

/// Configuration for the transitland client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API key sent in the `apikey` header
    pub api_key: String,
    /// Base URL for the API (defaults to production transitland)
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl ClientConfig {
    /// Create a new config with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Set a custom base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// Transitland REST API client.
#[derive(Debug, Clone)]
pub struct TransitlandClient {
    http: reqwest::Client,
    base_url: String,
    api_key: HeaderValue,
}

impl TransitlandClient {
    /// Create a new client with the given configuration.
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let api_key = HeaderValue::from_str(&config.api_key).map_err(|_| ApiError::Http {
            status: 0,
            message: "Invalid API key format".to_string(),
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            HeaderValue::from_static("application/json"),
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Resolve an endpoint to a full URL.
    pub fn url_for(&self, endpoint: &str) -> String {
        resolve_endpoint(&self.base_url, endpoint)
    }
}

/// Join a relative endpoint onto `base_url`; absolute URLs pass through.
pub fn resolve_endpoint(base_url: &str, endpoint: &str) -> String {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        endpoint.to_string()
    } else if endpoint.starts_with('/') {
        format!("{base_url}{endpoint}")
    } else {
        format!("{base_url}/{endpoint}")
    }
}

/// Strip `base_url` from an absolute URL so it can be stored as an endpoint.
///
/// URLs on other hosts are returned unchanged.
pub fn relative_endpoint<'a>(base_url: &str, url: &'a str) -> &'a str {
    url.strip_prefix(base_url.trim_end_matches('/'))
        .filter(|rest| rest.starts_with('/'))
        .unwrap_or(url)
}

impl ApiCaller for TransitlandClient {
    async fn call(
        &self,
        endpoint: &str,
        filter: &FieldFilter,
        nesting_limit: usize,
        attach_api_key: bool,
    ) -> Result<Value, ApiError> {
        let url = self.url_for(endpoint);
        debug!(%url, "transitland request");

        let mut request = self.http.get(&url);
        if attach_api_key {
            request = request.header("apikey", self.api_key.clone());
        }

        let response = request.send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(ApiError::Unauthorized);
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ApiError::RateLimited);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Http {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.text().await?;
        trace!(bytes = body.len(), "transitland response");

        parse_document(&body, filter, nesting_limit)
    }
}

/// Deserialize, filter and depth-check a response body.
pub fn parse_document(
    body: &str,
    filter: &FieldFilter,
    nesting_limit: usize,
) -> Result<Value, ApiError> {
    let doc: Value = serde_json::from_str(body).map_err(|e| ApiError::Json {
        message: e.to_string(),
        body: Some(body.chars().take(500).collect()),
    })?;

    let filtered = filter.apply(&doc);
    let depth = nesting_depth(&filtered);
    if depth > nesting_limit {
        return Err(ApiError::Json {
            message: format!("nesting limit exceeded ({depth} > {nesting_limit})"),
            body: None,
        });
    }

    Ok(filtered)
}
