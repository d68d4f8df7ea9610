//! Request parameters and the per-client parameter store.
//!
//! # Design
//! Values form a small tree: a scalar string, a list, a sparse list, or a
//! nested map. Maps are insertion-ordered so the outgoing query string
//! reflects the order in which the caller set parameters; signing sorts its
//! own copy and never depends on that order.
//!
//! `ParamStore` also owns the last successful response body, because the
//! two share a lifecycle: assigning a single parameter after a body has
//! been stored wipes both before the new value goes in.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

/// Insertion-ordered mapping from parameter name to value.
pub type ParamMap = IndexMap<String, ParamValue>;

/// A single parameter value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Scalar(String),
    List(Vec<ParamValue>),
    /// A list with holes, keyed by position. Orders numerically like `List`.
    Sparse(BTreeMap<usize, ParamValue>),
    Map(ParamMap),
}

impl ParamValue {
    /// The string content of a scalar value, `None` for lists and maps.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Scalar(s) => Some(s),
            ParamValue::List(_) | ParamValue::Sparse(_) | ParamValue::Map(_) => None,
        }
    }

    /// Convert a JSON value. `null` has no representation and yields `None`.
    ///
    /// Booleans become `"1"`/`"0"` and numbers their decimal text. An array
    /// holding `null` elements becomes `Sparse`, keeping the original indices
    /// of the remaining elements so encoded indices keep their gaps.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Bool(b) => Some(ParamValue::Scalar(if *b { "1" } else { "0" }.to_string())),
            Value::Number(n) => Some(ParamValue::Scalar(n.to_string())),
            Value::String(s) => Some(ParamValue::Scalar(s.clone())),
            Value::Array(items) if items.iter().any(Value::is_null) => Some(ParamValue::Sparse(
                items
                    .iter()
                    .enumerate()
                    .filter_map(|(i, v)| Some((i, ParamValue::from_json(v)?)))
                    .collect(),
            )),
            Value::Array(items) => Some(ParamValue::List(
                items.iter().filter_map(ParamValue::from_json).collect(),
            )),
            Value::Object(fields) => Some(ParamValue::Map(map_from_json(fields))),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Scalar(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Scalar(value)
    }
}

impl From<Vec<ParamValue>> for ParamValue {
    fn from(value: Vec<ParamValue>) -> Self {
        ParamValue::List(value)
    }
}

impl From<ParamMap> for ParamValue {
    fn from(value: ParamMap) -> Self {
        ParamValue::Map(value)
    }
}

fn map_from_json(fields: &serde_json::Map<String, Value>) -> ParamMap {
    fields
        .iter()
        .filter_map(|(k, v)| Some((k.clone(), ParamValue::from_json(v)?)))
        .collect()
}

/// Characters stripped from both ends of a value by [`ParamStore::set`].
/// Unicode spaces such as U+3000 are part of the value.
const TRIMMED: &[char] = &[' ', '\t', '\n', '\r', '\0', '\x0B'];

/// Caller parameters plus the body of the last 200 response.
#[derive(Debug, Clone, Default)]
pub struct ParamStore {
    params: ParamMap,
    body: Option<String>,
}

impl ParamStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` with surrounding ASCII whitespace and NUL trimmed.
    ///
    /// If a response body is currently stored, the whole store (parameters
    /// and body) is cleared first, so a new request never inherits the
    /// previous one's parameters.
    pub fn set(&mut self, name: impl Into<String>, value: &str) {
        if self.body.is_some() {
            self.params.clear();
            self.body = None;
        }
        self.params
            .insert(name.into(), ParamValue::Scalar(value.trim_matches(TRIMMED).to_string()));
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.params.get(name)
    }

    /// Remove `name`, preserving the order of the remaining parameters.
    pub fn delete(&mut self, name: &str) {
        self.params.shift_remove(name);
    }

    /// Merge a JSON object into the store. Anything other than an object is
    /// ignored. Unlike [`ParamStore::set`], merging never clears a stored body.
    pub fn merge_json(&mut self, value: &Value) {
        if let Value::Object(fields) = value {
            self.merge(map_from_json(fields));
        }
    }

    /// Merge a typed map; same-named keys are overwritten in place.
    pub fn merge(&mut self, params: ParamMap) {
        self.params.extend(params);
    }

    pub fn all(&self) -> &ParamMap {
        &self.params
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    pub(crate) fn store_body(&mut self, body: String) {
        self.body = Some(body);
    }
}
