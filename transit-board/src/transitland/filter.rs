//! Response field filtering.
//!
//! Transitland responses carry far more fields than the board consumes. A
//! [`FieldFilter`] is a template document that mirrors the response shape:
//!
//! - `true` keeps the value at that position as-is
//! - an object keeps only the listed keys, filtering each with its sub-filter
//! - an array filters every element with the array's first element
//!
//! Anything not named by the filter is dropped, so a filtered document only
//! contains what the retriever will read.

use serde_json::{Map, Value};

/// Default nesting limit for filtered documents.
pub const DEFAULT_NESTING_LIMIT: usize = 10;

/// A filter template applied to every response document.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter(Value);

impl FieldFilter {
    /// Create a filter from a template document.
    pub fn new(template: Value) -> Self {
        Self(template)
    }

    /// A filter that keeps the whole document.
    pub fn keep_all() -> Self {
        Self(Value::Bool(true))
    }

    /// The template document.
    pub fn template(&self) -> &Value {
        &self.0
    }

    /// Apply the filter, returning a pruned copy of `doc`.
    pub fn apply(&self, doc: &Value) -> Value {
        filter_value(doc, &self.0).unwrap_or(Value::Null)
    }
}

fn filter_value(doc: &Value, filter: &Value) -> Option<Value> {
    match filter {
        Value::Bool(true) => Some(doc.clone()),
        Value::Object(fields) => {
            let obj = doc.as_object()?;
            let mut out = Map::new();
            for (key, sub) in fields {
                if let Some(v) = obj.get(key)
                    && let Some(kept) = filter_value(v, sub)
                {
                    out.insert(key.clone(), kept);
                }
            }
            Some(Value::Object(out))
        }
        Value::Array(elements) => {
            let arr = doc.as_array()?;
            let elem_filter = elements.first()?;
            Some(Value::Array(
                arr.iter()
                    .map(|v| filter_value(v, elem_filter).unwrap_or(Value::Null))
                    .collect(),
            ))
        }
        _ => None,
    }
}

/// Depth of nested arrays/objects in a document. Scalars have depth 0.
pub fn nesting_depth(doc: &Value) -> usize {
    match doc {
        Value::Array(arr) => 1 + arr.iter().map(nesting_depth).max().unwrap_or(0),
        Value::Object(obj) => 1 + obj.values().map(nesting_depth).max().unwrap_or(0),
        _ => 0,
    }
}
