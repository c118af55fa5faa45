//! Paginated fetch engine shared by every retriever.
//!
//! A retrieval walks `meta.next` links page by page, handing each element
//! of one designated array to an [`ElementParser`]. Timeouts are retried in
//! place; any other failure abandons the whole retrieval, since a partial
//! page set cannot be told apart from a complete one.

use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use super::error::RetrieveError;
use super::indicator::Indicator;
use crate::transitland::{
    ApiCaller, ApiErrorKind, DEFAULT_BASE_URL, DEFAULT_NESTING_LIMIT, FieldFilter,
    relative_endpoint,
};

/// Maximum number of pages visited per retrieval.
pub const MAX_PAGES: usize = 5;

/// Delay before retrying a page that timed out.
pub const RETRY_DELAY: Duration = Duration::from_secs(10);

/// Pause between consecutive pages.
pub const PAGE_DELAY: Duration = Duration::from_secs(1);

/// Pagination limits and pacing.
#[derive(Debug, Clone)]
pub struct PageConfig {
    /// Pages visited before giving up on further `next` links
    pub max_pages: usize,
    /// Wait after a timeout before asking for the same page again
    pub retry_delay: Duration,
    /// Wait after each page
    pub page_delay: Duration,
    /// Prefix stripped from `meta.next` links
    pub base_url: String,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            max_pages: MAX_PAGES,
            retry_delay: RETRY_DELAY,
            page_delay: PAGE_DELAY,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl PageConfig {
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

/// Consumes the elements of one array field, page after page.
pub trait ElementParser {
    /// Top-level key of the array to consume.
    const ARRAY_KEY: &'static str;

    /// Deepest nesting accepted in a filtered page.
    const NESTING_LIMIT: usize = DEFAULT_NESTING_LIMIT;

    /// Handle one non-null element. Elements that fail validation are
    /// dropped here without failing the retrieval.
    fn parse_element(&mut self, element: &Value);
}

/// Drives the page loop against an [`ApiCaller`].
pub struct Paginator<'a, C> {
    caller: &'a C,
    config: &'a PageConfig,
    fault: Option<&'a Indicator>,
    rate_limit: Option<&'a Indicator>,
}

impl<'a, C: ApiCaller> Paginator<'a, C> {
    pub fn new(caller: &'a C, config: &'a PageConfig) -> Self {
        Self {
            caller,
            config,
            fault: None,
            rate_limit: None,
        }
    }

    /// Lower `indicator` at the start of each page and raise it on failure.
    pub fn with_fault(mut self, indicator: &'a Indicator) -> Self {
        self.fault = Some(indicator);
        self
    }

    /// Raise `indicator` whenever the API rate-limits a request.
    pub fn with_rate_limit(mut self, indicator: &'a Indicator) -> Self {
        self.rate_limit = Some(indicator);
        self
    }

    pub fn config(&self) -> &PageConfig {
        self.config
    }

    /// Fetch pages starting at `endpoint` and feed every element to `parser`.
    ///
    /// Returns the number of pages consumed. An empty but well-formed result
    /// set is a success.
    pub async fn run<P: ElementParser>(
        &self,
        endpoint: &str,
        filter: &FieldFilter,
        parser: &mut P,
    ) -> Result<usize, RetrieveError> {
        let mut pages = 0;
        let mut current = endpoint.to_string();

        while !current.is_empty() && pages < self.config.max_pages {
            self.set_fault(false);

            let doc = match self
                .caller
                .call(&current, filter, P::NESTING_LIMIT, true)
                .await
            {
                Ok(doc) => doc,
                Err(err) => {
                    self.set_fault(true);
                    match err.kind() {
                        ApiErrorKind::Timeout => {
                            warn!(endpoint = %current, page = pages, "request timed out, retrying");
                            tokio::time::sleep(self.config.retry_delay).await;
                            continue;
                        }
                        ApiErrorKind::RateLimited => {
                            if let Some(indicator) = self.rate_limit {
                                indicator.raise();
                            }
                        }
                        ApiErrorKind::Http | ApiErrorKind::Deserialize => {}
                    }
                    warn!(endpoint = %current, page = pages, error = %err, "retrieval failed");
                    return Err(RetrieveError::Api {
                        endpoint: current,
                        source: err,
                    });
                }
            };

            current = doc
                .pointer("/meta/next")
                .and_then(Value::as_str)
                .map(|next| relative_endpoint(&self.config.base_url, next).to_string())
                .unwrap_or_default();

            let Some(elements) = doc.get(P::ARRAY_KEY).and_then(Value::as_array) else {
                self.set_fault(true);
                warn!(key = P::ARRAY_KEY, "response is missing its element array");
                return Err(RetrieveError::MissingArray(P::ARRAY_KEY));
            };

            debug!(key = P::ARRAY_KEY, page = pages, elements = elements.len(), "page received");
            for element in elements.iter().filter(|e| !e.is_null()) {
                parser.parse_element(element);
            }

            tokio::time::sleep(self.config.page_delay).await;
            pages += 1;
        }

        Ok(pages)
    }

    fn set_fault(&self, raised: bool) {
        if let Some(indicator) = self.fault {
            if raised {
                indicator.raise();
            } else {
                indicator.lower();
            }
        }
    }
}
