//! Static client configuration.
//!
//! Loading the configuration is left to the application; `ClientConfig`
//! implements `Deserialize` so it can come straight out of a JSON or TOML
//! document, and `validate` runs when the client is constructed.

use std::fmt;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::ConfigError;

/// Credentials and endpoint for one remote API.
#[derive(Clone, Deserialize)]
pub struct ClientConfig {
    /// Application key, sent as the `key` parameter.
    pub key: String,
    /// Signing namespace, prepended to the signed string.
    pub prefix: String,
    /// Shared secret. Only ever fed into the hash, never transmitted.
    pub secret: String,
    /// Endpoint every request goes to.
    pub url: String,
    #[serde(default)]
    pub debug: bool,
    /// Default headers applied by the transport to every request.
    #[serde(default)]
    pub headers: IndexMap<String, String>,
}

impl ClientConfig {
    pub fn new(
        key: impl Into<String>,
        prefix: impl Into<String>,
        secret: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            prefix: prefix.into(),
            secret: secret.into(),
            url: url.into(),
            debug: false,
            headers: IndexMap::new(),
        }
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Reject empty credentials and anything that is not an absolute
    /// `http`/`https` URL. An empty `prefix` is allowed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [("key", &self.key), ("secret", &self.secret), ("url", &self.url)] {
            if value.trim().is_empty() {
                return Err(ConfigError::EmptyField(name));
            }
        }
        let parsed = url::Url::parse(&self.url).map_err(|e| ConfigError::InvalidUrl {
            url: self.url.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUrl {
                url: self.url.clone(),
                reason: format!("unsupported scheme `{}`", parsed.scheme()),
            });
        }
        Ok(())
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("key", &self.key)
            .field("prefix", &self.prefix)
            .field("secret", &"<redacted>")
            .field("url", &self.url)
            .field("debug", &self.debug)
            .field("headers", &self.headers)
            .finish()
    }
}
