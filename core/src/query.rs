//! Form-style query string encoding for GET payloads.
//!
//! Scalars are rendered the way the registrar's query parser reads them:
//! booleans as `1`/`0`, `null` dropped, nested values addressed with
//! bracketed keys (`items[0][name]`).

use serde_json::Value;
use url::Url;

use crate::Payload;

/// Flatten a payload into ordered `(key, value)` pairs.
pub fn encode_query(payload: &Payload) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (key, value) in payload {
        flatten(key.clone(), value, &mut pairs);
    }
    pairs
}

/// Append the payload's pairs to `url`, keeping any query already present.
pub fn append_query(url: &mut Url, payload: &Payload) {
    let pairs = encode_query(payload);
    if pairs.is_empty() {
        return;
    }
    url.query_pairs_mut().extend_pairs(pairs);
}

fn flatten(key: String, value: &Value, out: &mut Vec<(String, String)>) {
    match value {
        Value::Null => {}
        Value::Bool(b) => out.push((key, if *b { "1" } else { "0" }.to_string())),
        Value::Number(n) => out.push((key, n.to_string())),
        Value::String(s) => out.push((key, s.clone())),
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                flatten(format!("{key}[{i}]"), item, out);
            }
        }
        Value::Object(map) => {
            for (sub, item) in map {
                flatten(format!("{key}[{sub}]"), item, out);
            }
        }
    }
}
