use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{RawQuery, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use sigapi_core::{sign, ClientConfig, ParamMap, ParamValue, SignError};
use tokio::net::TcpListener;

/// Credentials the server checks incoming signatures against.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub key: String,
    pub prefix: String,
    pub secret: String,
}

impl Credentials {
    pub fn new(key: &str, prefix: &str, secret: &str) -> Self {
        Self {
            key: key.to_string(),
            prefix: prefix.to_string(),
            secret: secret.to_string(),
        }
    }

    fn to_config(&self) -> ClientConfig {
        // the url is never part of the signed string
        ClientConfig::new(&self.key, &self.prefix, &self.secret, "http://localhost/")
    }
}

#[derive(Clone)]
struct AppState {
    config: Arc<ClientConfig>,
}

pub fn app(credentials: &Credentials) -> Router {
    let state = AppState {
        config: Arc::new(credentials.to_config()),
    };
    Router::new()
        .route("/api", get(handle_get).post(handle_post))
        .with_state(state)
}

pub async fn run(listener: TcpListener, credentials: Credentials) -> Result<(), std::io::Error> {
    axum::serve(listener, app(&credentials)).await
}

async fn handle_get(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> (StatusCode, Json<Value>) {
    let params = parse_form(query.as_deref().unwrap_or_default());
    verify(&state.config, params)
}

async fn handle_post(State(state): State<AppState>, body: String) -> (StatusCode, Json<Value>) {
    verify(&state.config, parse_form(&body))
}

fn reject(status: StatusCode, error: &str) -> (StatusCode, Json<Value>) {
    tracing::warn!(status = status.as_u16(), error, "rejecting request");
    (status, Json(json!({"code": status.as_u16(), "error": error})))
}

fn verify(config: &ClientConfig, params: ParamMap) -> (StatusCode, Json<Value>) {
    let scalar = |name: &str| params.get(name).and_then(ParamValue::as_str);

    if scalar("key") != Some(config.key.as_str()) {
        return reject(StatusCode::FORBIDDEN, "unknown key");
    }
    let Some(ts) = scalar("ts").and_then(|ts| ts.parse::<u64>().ok()) else {
        return reject(StatusCode::BAD_REQUEST, "missing or invalid ts");
    };
    let Some(signature) = scalar("sign") else {
        return reject(StatusCode::BAD_REQUEST, "missing sign");
    };

    // The wire form cannot tell a list from a map keyed `0..n`, so both
    // readings are tried. A request mixing the two with 11+ entries each
    // would match neither.
    let sequences = as_sequences(&params);
    let checked = sign::verify_signature(config, &sequences, ts, signature).and_then(|ok| {
        if ok {
            Ok(Some(&sequences))
        } else {
            sign::verify_signature(config, &params, ts, signature)
                .map(|ok| ok.then_some(&params))
        }
    });

    match checked {
        Ok(Some(verified)) => {
            let api = scalar("api").unwrap_or_default();
            tracing::info!(api, "signature verified");
            (
                StatusCode::OK,
                Json(json!({
                    "code": 0,
                    "api": api,
                    "debug": scalar("debug") == Some("1"),
                    "params": sign::signable(verified),
                })),
            )
        }
        Ok(None) => reject(StatusCode::FORBIDDEN, "invalid signature"),
        Err(SignError::MissingMethodName) => reject(StatusCode::BAD_REQUEST, "missing api"),
        Err(SignError::MethodNameNotScalar) => reject(StatusCode::BAD_REQUEST, "invalid api"),
    }
}

/// Decode a query string or form body into a parameter tree, rebuilding
/// nesting from bracketed keys (`a[b][0]=x`). Every nested level is a map.
pub fn parse_form(input: &str) -> ParamMap {
    let mut params = ParamMap::new();
    for (key, value) in form_urlencoded::parse(input.as_bytes()) {
        let path = split_key(&key);
        insert_path(&mut params, &path, value.into_owned());
    }
    params
}

/// Read every nested map keyed only by integers as a sequence: `List` when
/// the indices are exactly `0..n`, `Sparse` otherwise.
pub fn as_sequences(params: &ParamMap) -> ParamMap {
    params
        .iter()
        .map(|(k, v)| (k.clone(), sequence_value(v)))
        .collect()
}

fn split_key(key: &str) -> Vec<String> {
    let Some(open) = key.find('[') else {
        return vec![key.to_string()];
    };
    let mut path = vec![key[..open].to_string()];
    let mut rest = &key[open..];
    while let Some(stripped) = rest.strip_prefix('[') {
        let Some(close) = stripped.find(']') else {
            // unbalanced brackets: keep the key verbatim
            return vec![key.to_string()];
        };
        path.push(stripped[..close].to_string());
        rest = &stripped[close + 1..];
    }
    path
}

fn insert_path(map: &mut ParamMap, path: &[String], value: String) {
    let (head, tail) = match path {
        [] => return,
        [head, tail @ ..] => (head, tail),
    };
    let head = if head.is_empty() {
        map.len().to_string()
    } else {
        head.clone()
    };
    if tail.is_empty() {
        map.insert(head, ParamValue::Scalar(value));
        return;
    }
    let entry = map
        .entry(head)
        .or_insert_with(|| ParamValue::Map(ParamMap::new()));
    if !matches!(entry, ParamValue::Map(_)) {
        *entry = ParamValue::Map(ParamMap::new());
    }
    if let ParamValue::Map(inner) = entry {
        insert_path(inner, tail, value);
    }
}

fn sequence_value(value: &ParamValue) -> ParamValue {
    let ParamValue::Map(map) = value else {
        return value.clone();
    };
    let indices: Option<Vec<usize>> = map.keys().map(|k| parse_index(k)).collect();
    match indices {
        Some(indices) if !map.is_empty() => {
            let sparse: BTreeMap<usize, ParamValue> = indices
                .into_iter()
                .zip(map.values().map(sequence_value))
                .collect();
            let dense = sparse.keys().enumerate().all(|(pos, i)| pos == *i);
            if dense {
                ParamValue::List(sparse.into_values().collect())
            } else {
                ParamValue::Sparse(sparse)
            }
        }
        _ => ParamValue::Map(as_sequences(map)),
    }
}

/// `0`, `1`, `42`; not `01`, `-1` or `+1`.
fn parse_index(key: &str) -> Option<usize> {
    let digits = !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit());
    if digits && (key == "0" || !key.starts_with('0')) {
        key.parse().ok()
    } else {
        None
    }
}
