//! Blocking `Transport` backed by ureq.

use crate::config::ClientConfig;
use crate::encode;
use crate::error::TransportError;
use crate::http::{HttpResponse, Transport};

/// Sends requests with a shared `ureq::Agent`, adding the configured
/// default headers to each one.
///
/// 4xx/5xx answers are returned as responses, not errors, so the client can
/// apply its own status policy.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
    headers: Vec<(String, String)>,
}

impl UreqTransport {
    pub fn new(headers: Vec<(String, String)>) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent, headers }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(
            config
                .headers
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

fn read_response(
    mut response: ureq::http::Response<ureq::Body>,
    url: &str,
) -> Result<HttpResponse, TransportError> {
    let status = response.status().as_u16();
    let body = response
        .body_mut()
        .read_to_string()
        .map_err(|e| TransportError::with_source(format!("reading body from {url} failed"), e))?;
    Ok(HttpResponse::new(status, body))
}

impl Transport for UreqTransport {
    fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
        let mut request = self.agent.get(url);
        for (name, value) in &self.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        let response = request
            .call()
            .map_err(|e| TransportError::with_source(format!("GET {url} failed"), e))?;
        read_response(response, url)
    }

    fn post(&self, url: &str, form: &[(String, String)]) -> Result<HttpResponse, TransportError> {
        let mut request = self.agent.post(url);
        for (name, value) in &self.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        let body = encode::encode_pairs(form);
        let response = request
            .content_type("application/x-www-form-urlencoded")
            .send(body.as_bytes())
            .map_err(|e| TransportError::with_source(format!("POST {url} failed"), e))?;
        read_response(response, url)
    }
}
