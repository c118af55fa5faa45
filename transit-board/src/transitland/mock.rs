//! Scripted API caller for testing without API access.
//!
//! Serves canned documents keyed by endpoint, and records every call so
//! tests can assert on the request sequence.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use serde_json::Value;

use super::client::{ApiCaller, parse_document};
use super::error::ApiError;
use super::filter::FieldFilter;

/// A call observed by [`ScriptedCaller`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub endpoint: String,
    pub attach_api_key: bool,
}

#[derive(Default)]
struct Script {
    /// One-shot responses, consumed in order before `standing`.
    queued: HashMap<String, VecDeque<Result<Value, ApiError>>>,
    /// Responses returned on every call once `queued` is drained.
    standing: HashMap<String, Value>,
    calls: Vec<RecordedCall>,
}

/// Mock [`ApiCaller`] that serves scripted responses.
///
/// Responses go through the same filter and nesting-limit handling as the
/// real client, so retrievers see exactly what they would in production.
/// Endpoints with no script answer with HTTP 404.
#[derive(Default)]
pub struct ScriptedCaller {
    script: Mutex<Script>,
}

impl ScriptedCaller {
    /// Create an empty caller.
    pub fn new() -> Self {
        Self::default()
    }

    /// Always answer `endpoint` with `doc` (after any queued responses).
    pub fn respond(&self, endpoint: impl Into<String>, doc: Value) -> &Self {
        self.lock().standing.insert(endpoint.into(), doc);
        self
    }

    /// Answer the next call to `endpoint` with `result`.
    pub fn enqueue(&self, endpoint: impl Into<String>, result: Result<Value, ApiError>) -> &Self {
        self.lock()
            .queued
            .entry(endpoint.into())
            .or_default()
            .push_back(result);
        self
    }

    /// All calls made so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    /// Number of calls made to `endpoint`.
    pub fn call_count(&self, endpoint: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.endpoint == endpoint)
            .count()
    }

    /// Total number of calls made.
    pub fn total_calls(&self) -> usize {
        self.lock().calls.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        // A panicking test thread must not hide the script from other assertions.
        self.script.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn next_response(&self, endpoint: &str, attach_api_key: bool) -> Result<Value, ApiError> {
        let mut script = self.lock();
        script.calls.push(RecordedCall {
            endpoint: endpoint.to_string(),
            attach_api_key,
        });

        if let Some(result) = script.queued.get_mut(endpoint).and_then(VecDeque::pop_front) {
            return result;
        }

        script
            .standing
            .get(endpoint)
            .cloned()
            .ok_or_else(|| ApiError::Http {
                status: 404,
                message: format!("no scripted response for {endpoint}"),
            })
    }
}

impl ApiCaller for ScriptedCaller {
    async fn call(
        &self,
        endpoint: &str,
        filter: &FieldFilter,
        nesting_limit: usize,
        attach_api_key: bool,
    ) -> Result<Value, ApiError> {
        let doc = self.next_response(endpoint, attach_api_key)?;
        parse_document(&doc.to_string(), filter, nesting_limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn queued_before_standing() {
        let caller = ScriptedCaller::new();
        caller
            .respond("/a", json!({ "n": 2 }))
            .enqueue("/a", Ok(json!({ "n": 1 })));

        let filter = FieldFilter::keep_all();
        assert_eq!(
            caller.call("/a", &filter, 10, true).await.unwrap(),
            json!({ "n": 1 })
        );
        assert_eq!(
            caller.call("/a", &filter, 10, true).await.unwrap(),
            json!({ "n": 2 })
        );
        assert_eq!(
            caller.call("/a", &filter, 10, true).await.unwrap(),
            json!({ "n": 2 })
        );
        assert_eq!(caller.call_count("/a"), 3);
    }

    #[tokio::test]
    async fn unknown_endpoint_is_404() {
        let caller = ScriptedCaller::new();
        let err = caller
            .call("/missing", &FieldFilter::keep_all(), 10, false)
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert_eq!(
            caller.calls(),
            vec![RecordedCall {
                endpoint: "/missing".to_string(),
                attach_api_key: false
            }]
        );
    }

    #[tokio::test]
    async fn applies_filter() {
        let caller = ScriptedCaller::new();
        caller.respond("/a", json!({ "keep": 1, "drop": 2 }));
        let filter = FieldFilter::new(json!({ "keep": true }));
        assert_eq!(
            caller.call("/a", &filter, 10, true).await.unwrap(),
            json!({ "keep": 1 })
        );
    }
}
