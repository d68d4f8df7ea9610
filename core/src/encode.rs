//! Form/query-string encoding of parameter trees.
//!
//! Nested values flatten into bracketed keys (`filter[age][min]=18`,
//! `ids[0]=3`) and both keys and values are percent-encoded the way the
//! remote API's own tooling does it: ASCII alphanumerics and `.` `_` `-`
//! pass through, space becomes `+`, every other byte becomes `%XX`. The
//! signature is computed over this exact text, so the encoder has to be
//! byte-for-byte stable.

use crate::params::{ParamMap, ParamValue};

/// Percent-encode one key or value.
pub fn urlencode(input: &str) -> String {
    // form_urlencoded leaves `*` alone; the server side encodes it.
    form_urlencoded::byte_serialize(input.as_bytes())
        .collect::<String>()
        .replace('*', "%2A")
}

/// Flatten a parameter tree into `(key, value)` pairs with raw bracketed
/// keys, in map order. Empty lists and maps produce no pairs.
pub fn flatten(params: &ParamMap) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (key, value) in params {
        flatten_into(key.clone(), value, &mut pairs);
    }
    pairs
}

fn flatten_into(prefix: String, value: &ParamValue, pairs: &mut Vec<(String, String)>) {
    match value {
        ParamValue::Scalar(s) => pairs.push((prefix, s.clone())),
        ParamValue::List(items) => {
            for (i, item) in items.iter().enumerate() {
                flatten_into(format!("{prefix}[{i}]"), item, pairs);
            }
        }
        ParamValue::Sparse(items) => {
            for (i, item) in items {
                flatten_into(format!("{prefix}[{i}]"), item, pairs);
            }
        }
        ParamValue::Map(map) => {
            for (k, v) in map {
                flatten_into(format!("{prefix}[{k}]"), v, pairs);
            }
        }
    }
}

/// Encode already-flattened pairs as `k=v&k=v`.
pub fn encode_pairs(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", urlencode(k), urlencode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Encode a parameter tree as a query string / form body.
pub fn build_query(params: &ParamMap) -> String {
    encode_pairs(&flatten(params))
}
