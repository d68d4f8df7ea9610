//! HTTP transport seam.
//!
//! # Design
//! The client never opens a connection itself. It hands a fully built URL
//! (GET) or URL plus flattened form pairs (POST) to an injected `Transport`
//! and reads back status and body. Connection reuse, TLS, timeouts and
//! retries are the transport's business. Tests plug in recording stubs; the
//! `ureq-transport` feature provides a blocking default.
//!
//! All fields use owned types so a request snapshot can outlive the call
//! that produced it.

use crate::error::TransportError;
use crate::params::ParamMap;

/// HTTP method used to dispatch a signed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

/// Snapshot of the last dispatched request.
///
/// `url` carries the query string for GET and is the bare endpoint for
/// POST. `params` is the full outgoing set, system fields included.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub timestamp: u64,
    pub params: ParamMap,
    /// Status of the answer, `None` until the transport returned one.
    pub status: Option<u16>,
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Executes the HTTP exchange on behalf of the client.
///
/// Non-2xx statuses must come back as `Ok` responses; `Err` is reserved for
/// exchanges that did not complete (connection refused, timeout, ...).
pub trait Transport {
    fn get(&self, url: &str) -> Result<HttpResponse, TransportError>;

    /// `form` holds flattened pairs with raw bracketed keys (`ids[0]`);
    /// the transport form-encodes them into the body.
    fn post(&self, url: &str, form: &[(String, String)]) -> Result<HttpResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
        (**self).get(url)
    }

    fn post(&self, url: &str, form: &[(String, String)]) -> Result<HttpResponse, TransportError> {
        (**self).post(url, form)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
        (**self).get(url)
    }

    fn post(&self, url: &str, form: &[(String, String)]) -> Result<HttpResponse, TransportError> {
        (**self).post(url, form)
    }
}
