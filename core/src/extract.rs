//! Error message and code extraction from variably shaped response bodies.
//!
//! # Design
//! The registrar reports failures in one of three envelopes:
//!
//! - `{"data": {"error": .., "code": ..}}`
//! - `{"error": {"message": .., "code": ..}}`
//! - `{"message": .., "code": ..}`
//!
//! Rather than branching per endpoint, each probe walks an ordered list of
//! candidate key paths and takes the first one that resolves to a non-null
//! value. The message and code probes run independently, so a body may
//! yield its message from one envelope and its code from another.

use serde_json::Value;

/// A sequence of object keys, outermost first.
pub type KeyPath = &'static [&'static str];

/// Candidate paths for the human-readable message, in priority order.
pub const MESSAGE_PATHS: &[KeyPath] = &[&["data", "error"], &["error", "message"], &["message"]];

/// Candidate paths for the machine error code, in priority order.
pub const CODE_PATHS: &[KeyPath] = &[&["data", "code"], &["error", "code"], &["code"]];

/// Message reported when no candidate path yields one.
pub const UNKNOWN_ERROR: &str = "Unknown API error";

/// Where a success body keeps its fields: login wraps them in `data`,
/// refresh returns them at the top level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Envelope {
    /// `{"data": {...}}`
    Data,
    /// Fields at the top level.
    Flat,
}

impl Envelope {
    pub fn detect(body: &Value) -> Envelope {
        if body.get("data").is_some_and(Value::is_object) {
            Envelope::Data
        } else {
            Envelope::Flat
        }
    }

    /// The object holding the fields for this envelope.
    pub fn fields(self, body: &Value) -> &Value {
        match self {
            Envelope::Data => &body["data"],
            Envelope::Flat => body,
        }
    }
}

/// Message and code pulled from an error response.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorDetails {
    pub message: String,
    pub code: Option<Value>,
}

impl ErrorDetails {
    pub fn from_body(body: &Value) -> Self {
        let message = first_available(body, MESSAGE_PATHS)
            .map(render_message)
            .unwrap_or_else(|| UNKNOWN_ERROR.to_string());
        let code = first_available(body, CODE_PATHS).cloned();
        Self { message, code }
    }
}

/// Value at `path`, if every key exists along the way.
pub fn value_at<'a>(body: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(body, |node, key| node.as_object()?.get(*key))
}

/// First non-null value among `paths`.
pub fn first_available<'a>(body: &'a Value, paths: &[KeyPath]) -> Option<&'a Value> {
    paths
        .iter()
        .filter_map(|path| value_at(body, path))
        .find(|value| !value.is_null())
}

fn render_message(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
