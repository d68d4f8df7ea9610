//! Client SDK for a signed key/value HTTP API.
//!
//! # Overview
//! Callers fill in request parameters (including `api`, the remote method
//! name), then call `get()` or `post()`. The client adds the application
//! `key`, a timestamp `ts`, the `debug` flag and an MD5 signature `sign`
//! computed over the canonicalized parameters, sends the request through an
//! injected transport and returns the body of the last 200 response.
//!
//! # Design
//! - `sign` is the only part with interoperability constraints: canonical
//!   ordering, reserved-name exclusion and the exact hashed string must match
//!   the server byte for byte. It is pure and tested against fixed vectors.
//! - I/O sits behind the `Transport` trait; `UreqTransport` (feature
//!   `ureq-transport`) is the blocking default.
//! - The timestamp comes from a `Clock` so signatures are reproducible in
//!   tests.

pub mod client;
pub mod clock;
pub mod config;
pub mod encode;
pub mod error;
pub mod http;
pub mod params;
pub mod sign;
#[cfg(feature = "ureq-transport")]
pub mod transport;

pub use client::SignedClient;
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::ClientConfig;
pub use error::{ApiError, ConfigError, SignError, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport};
pub use params::{ParamMap, ParamStore, ParamValue};
#[cfg(feature = "ureq-transport")]
pub use transport::UreqTransport;
