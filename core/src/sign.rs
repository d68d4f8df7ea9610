//! Request signature.
//!
//! The signed string is
//!
//! ```text
//! prefix + key + secret + api + ts + md5(canonical_query)
//! ```
//!
//! hashed once more with MD5 and rendered as lowercase hex. `canonical_query`
//! is the form encoding of every caller parameter except the reserved system
//! names, with map keys sorted by byte order at every depth and list items
//! kept in ascending index order. Because of the sort, the order in which
//! parameters were set never changes the signature.

use md5::{Digest, Md5};

use crate::config::ClientConfig;
use crate::encode;
use crate::error::SignError;
use crate::params::{ParamMap, ParamValue};

/// Names owned by the protocol rather than by the caller. None of them take
/// part in the canonical query.
pub const RESERVED_KEYS: [&str; 5] = ["key", "api", "sign", "ts", "debug"];

pub fn is_reserved(name: &str) -> bool {
    RESERVED_KEYS.contains(&name)
}

/// The caller's business parameters: everything but the reserved names.
pub fn signable(params: &ParamMap) -> ParamMap {
    params
        .iter()
        .filter(|(k, _)| !is_reserved(k))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Recursively sort map keys by byte order. Lists and sparse lists keep
/// ascending numeric index order.
pub fn canonicalize(params: &ParamMap) -> ParamMap {
    let mut sorted: ParamMap = params
        .iter()
        .map(|(k, v)| (k.clone(), canonicalize_value(v)))
        .collect();
    sorted.sort_keys();
    sorted
}

fn canonicalize_value(value: &ParamValue) -> ParamValue {
    match value {
        ParamValue::Scalar(s) => ParamValue::Scalar(s.clone()),
        ParamValue::List(items) => ParamValue::List(items.iter().map(canonicalize_value).collect()),
        ParamValue::Sparse(items) => ParamValue::Sparse(
            items
                .iter()
                .map(|(i, v)| (*i, canonicalize_value(v)))
                .collect(),
        ),
        ParamValue::Map(map) => ParamValue::Map(canonicalize(map)),
    }
}

/// The exact text hashed into the parameter digest.
pub fn canonical_query(params: &ParamMap) -> String {
    encode::build_query(&canonicalize(&signable(params)))
}

pub fn md5_hex(input: &str) -> String {
    hex::encode(Md5::digest(input.as_bytes()))
}

/// MD5 of the canonical query.
pub fn params_digest(params: &ParamMap) -> String {
    md5_hex(&canonical_query(params))
}

/// Compute the `sign` value for `params` at `timestamp`.
///
/// `params["api"]` must be present and a plain string.
pub fn compute_signature(
    config: &ClientConfig,
    params: &ParamMap,
    timestamp: u64,
) -> Result<String, SignError> {
    let api = params
        .get("api")
        .ok_or(SignError::MissingMethodName)?
        .as_str()
        .ok_or(SignError::MethodNameNotScalar)?;

    let digest = params_digest(params);
    let mut hasher = Md5::new();
    hasher.update(config.prefix.as_bytes());
    hasher.update(config.key.as_bytes());
    hasher.update(config.secret.as_bytes());
    hasher.update(api.as_bytes());
    hasher.update(timestamp.to_string().as_bytes());
    hasher.update(digest.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Recompute and compare, as the receiving side would.
pub fn verify_signature(
    config: &ClientConfig,
    params: &ParamMap,
    timestamp: u64,
    signature: &str,
) -> Result<bool, SignError> {
    Ok(compute_signature(config, params, timestamp)? == signature)
}
