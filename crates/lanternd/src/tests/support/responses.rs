//! Helpers for building requests and reading response dictionaries.

use lantern_bencode::{Dict, Value};

use crate::dispatch::Message;

/// Builds a request from string pairs.
#[must_use]
pub fn request(pairs: &[(&str, &str)]) -> Message {
    Message::from_pairs(pairs.iter().copied())
}

/// String field of a response.
#[must_use]
pub fn text<'a>(response: &'a Dict, key: &str) -> Option<&'a str> {
    response.get(key).and_then(Value::as_str)
}

/// The `status` list of a response.
#[must_use]
pub fn statuses(response: &Dict) -> Vec<&str> {
    response
        .get("status")
        .and_then(Value::as_list)
        .map(|list| list.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

/// Whether `status` contains `wanted`.
#[must_use]
pub fn has_status(response: &Dict, wanted: &str) -> bool {
    statuses(response).contains(&wanted)
}
