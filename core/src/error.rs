//! Error types for the signed API client.
//!
//! # Design
//! A non-200 answer is deliberately not an error: the client keeps the body
//! of the last successful call and records the status for inspection. Only
//! problems that make a request impossible or unsent surface here.

use thiserror::Error;

/// Rejected client configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("config field `{0}` must not be empty")]
    EmptyField(&'static str),

    #[error("invalid API url `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Signature could not be computed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignError {
    /// The `api` parameter names the remote method and is part of the
    /// signed string; without it no valid signature exists.
    #[error("parameter `api` is required for signing")]
    MissingMethodName,

    #[error("parameter `api` must be a plain string, not a list or map")]
    MethodNameNotScalar,
}

/// The injected transport failed to complete the exchange.
#[derive(Debug, Error)]
#[error("transport error: {message}")]
pub struct TransportError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Errors returned by `SignedClient`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Sign(#[from] SignError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}
