//! Results of remote plugin method invocations.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome of one `POST /plugin/remoteCall`.
///
/// Every invocation yields exactly one of these, success or not.  Calls are
/// never retried automatically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteCallResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RemoteCallResult {
    pub fn ok(result: Value) -> Self {
        Self {
            success: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(error.into()),
        }
    }

    /// Short human-readable rendering of the result or error, truncated to
    /// `max_chars` characters.
    pub fn preview(&self, max_chars: usize) -> String {
        let full = match (&self.result, &self.error) {
            (Some(Value::String(text)), _) => text.clone(),
            (Some(value), _) => value.to_string(),
            (None, Some(err)) => err.clone(),
            (None, None) => String::new(),
        };
        if full.chars().count() <= max_chars {
            full
        } else {
            let mut cut: String = full.chars().take(max_chars).collect();
            cut.push_str("...");
            cut
        }
    }
}

/// The shape of a home-feed result returned by `getHome`.
///
/// Plugins either return a pager object (`{"results": [...], "hasMore": ..}`)
/// or a bare array.  [`HomeListing::from_value`] is the single place where
/// the two are told apart.
#[derive(Debug, Clone, PartialEq)]
pub enum HomeListing {
    /// A pager object with a `results` array.
    ListResult { results: Vec<Value>, has_more: bool },
    /// A bare JSON array.
    RawList(Vec<Value>),
    /// Anything else (an error string, `null`, an object without `results`).
    Unrecognized,
}

impl HomeListing {
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Array(items) => HomeListing::RawList(items.clone()),
            Value::Object(map) => match map.get("results") {
                Some(Value::Array(items)) => HomeListing::ListResult {
                    results: items.clone(),
                    has_more: map.get("hasMore").and_then(Value::as_bool).unwrap_or(false),
                },
                _ => HomeListing::Unrecognized,
            },
            _ => HomeListing::Unrecognized,
        }
    }

    pub fn items(&self) -> &[Value] {
        match self {
            HomeListing::ListResult { results, .. } => results,
            HomeListing::RawList(items) => items,
            HomeListing::Unrecognized => &[],
        }
    }

    pub fn item_count(&self) -> usize {
        self.items().len()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
