//! Signed request dispatcher for a single API endpoint.
//!
//! # Design
//! `SignedClient` owns the configuration, an injected `Transport`, a `Clock`
//! and the mutable `ParamStore`. A call to [`SignedClient::get`] or
//! [`SignedClient::post`]:
//!
//! 1. stamps `ts` from the clock,
//! 2. signs the caller parameters as they stand,
//! 3. writes `key`, `sign`, `ts`, `debug` into a copy of them,
//! 4. encodes the copy into the URL (GET) or a form body (POST),
//! 5. keeps the body only if the status is 200.
//!
//! A non-200 answer leaves the previously stored body in place; the status
//! is still available through [`SignedClient::last_status`]. Every mutating
//! method takes `&mut self`, so one client serves one request at a time.

use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::ClientConfig;
use crate::encode;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, Transport};
use crate::params::{ParamMap, ParamStore, ParamValue};
use crate::sign;

pub struct SignedClient<T> {
    config: ClientConfig,
    transport: T,
    clock: Box<dyn Clock + Send + Sync>,
    store: ParamStore,
    last_request: Option<HttpRequest>,
}

#[cfg(feature = "ureq-transport")]
impl SignedClient<crate::transport::UreqTransport> {
    /// Client using the blocking ureq transport with the configured headers.
    pub fn with_default_transport(config: ClientConfig) -> Result<Self, ApiError> {
        let transport = crate::transport::UreqTransport::from_config(&config);
        Self::new(config, transport)
    }
}

impl<T: Transport> SignedClient<T> {
    /// Validate `config` and build a client around `transport`.
    pub fn new(config: ClientConfig, transport: T) -> Result<Self, ApiError> {
        config.validate()?;
        Ok(Self {
            config,
            transport,
            clock: Box::new(SystemClock),
            store: ParamStore::new(),
            last_request: None,
        })
    }

    /// Replace the time source used for `ts`.
    pub fn with_clock(mut self, clock: impl Clock + Send + Sync + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Set one parameter (trimmed). The first assignment after a stored
    /// response clears all parameters and the stored body beforehand.
    pub fn set_param(&mut self, name: impl Into<String>, value: impl AsRef<str>) {
        self.store.set(name, value.as_ref());
    }

    pub fn get_param(&self, name: &str) -> Option<&ParamValue> {
        self.store.get(name)
    }

    pub fn delete_param(&mut self, name: &str) {
        self.store.delete(name);
    }

    /// Merge a JSON object into the parameters. Non-objects are ignored and
    /// a stored response is left alone.
    pub fn merge_params(&mut self, params: &serde_json::Value) {
        self.store.merge_json(params);
    }

    pub fn merge_map(&mut self, params: ParamMap) {
        self.store.merge(params);
    }

    pub fn params(&self) -> &ParamMap {
        self.store.all()
    }

    /// URL of the last dispatched request; includes the query string for GET.
    pub fn last_url(&self) -> Option<&str> {
        self.last_request.as_ref().map(|r| r.url.as_str())
    }

    pub fn last_request(&self) -> Option<&HttpRequest> {
        self.last_request.as_ref()
    }

    pub fn last_status(&self) -> Option<u16> {
        self.last_request.as_ref().and_then(|r| r.status)
    }

    /// Body of the last 200 response, if any.
    pub fn result(&self) -> Option<&str> {
        self.store.body()
    }

    /// Send the parameters as a query string and return the stored body.
    pub fn get(&mut self) -> Result<Option<&str>, ApiError> {
        self.send(HttpMethod::Get)?;
        Ok(self.store.body())
    }

    /// Send the parameters as a form body and return the stored body.
    pub fn post(&mut self) -> Result<Option<&str>, ApiError> {
        self.send(HttpMethod::Post)?;
        Ok(self.store.body())
    }

    fn send(&mut self, method: HttpMethod) -> Result<(), ApiError> {
        let timestamp = self.clock.now_secs();
        let signature = sign::compute_signature(&self.config, self.store.all(), timestamp)?;

        let mut outgoing = self.store.all().clone();
        outgoing.insert("key".to_string(), self.config.key.clone().into());
        outgoing.insert("sign".to_string(), signature.into());
        outgoing.insert("ts".to_string(), timestamp.to_string().into());
        outgoing.insert(
            "debug".to_string(),
            if self.config.debug { "1" } else { "0" }.into(),
        );

        let mut url = self.config.url.clone();
        if method == HttpMethod::Get {
            url.push('?');
            url.push_str(&encode::build_query(&outgoing));
        }

        debug!(
            method = method.as_str(),
            api = outgoing.get("api").and_then(ParamValue::as_str).unwrap_or_default(),
            timestamp,
            url = %url,
            "dispatching signed request"
        );

        let form = match method {
            HttpMethod::Get => Vec::new(),
            HttpMethod::Post => encode::flatten(&outgoing),
        };
        let request = self.last_request.insert(HttpRequest {
            method,
            url,
            timestamp,
            params: outgoing,
            status: None,
        });

        let response = match method {
            HttpMethod::Get => self.transport.get(&request.url)?,
            HttpMethod::Post => self.transport.post(&request.url, &form)?,
        };
        request.status = Some(response.status);

        if response.status == 200 {
            debug!(bytes = response.body.len(), "storing response body");
            self.store.store_body(response.body);
        } else {
            warn!(
                method = method.as_str(),
                status = response.status,
                "non-200 response, keeping previous result"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::VecDeque;

    use super::*;
    use crate::clock::FixedClock;
    use crate::error::{ConfigError, SignError, TransportError};
    use crate::http::HttpResponse;

    const TS: u64 = 1_700_000_000;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Get(String),
        Post(String, Vec<(String, String)>),
    }

    /// Replays canned responses and records what it was asked to send.
    #[derive(Default)]
    struct StubTransport {
        responses: RefCell<VecDeque<Result<HttpResponse, TransportError>>>,
        calls: RefCell<Vec<Call>>,
    }

    impl StubTransport {
        fn replying(responses: Vec<HttpResponse>) -> Self {
            Self {
                responses: RefCell::new(responses.into_iter().map(Ok).collect()),
                calls: RefCell::default(),
            }
        }

        fn failing() -> Self {
            Self {
                responses: RefCell::new(VecDeque::from([Err(TransportError::new("boom"))])),
                calls: RefCell::default(),
            }
        }

        fn next(&self) -> Result<HttpResponse, TransportError> {
            self.responses
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Ok(HttpResponse::new(200, "")))
        }
    }

    impl Transport for StubTransport {
        fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
            self.calls.borrow_mut().push(Call::Get(url.to_string()));
            self.next()
        }

        fn post(&self, url: &str, form: &[(String, String)]) -> Result<HttpResponse, TransportError> {
            self.calls
                .borrow_mut()
                .push(Call::Post(url.to_string(), form.to_vec()));
            self.next()
        }
    }

    fn config() -> ClientConfig {
        ClientConfig::new("K", "P", "S", "http://x/")
    }

    fn client(transport: &StubTransport) -> SignedClient<&StubTransport> {
        SignedClient::new(config(), transport)
            .unwrap()
            .with_clock(FixedClock(TS))
    }

    #[test]
    fn new_rejects_invalid_config() {
        let stub = StubTransport::default();
        let mut bad = config();
        bad.secret.clear();
        let err = SignedClient::new(bad, &stub).err().unwrap();
        assert!(matches!(
            err,
            ApiError::Config(ConfigError::EmptyField("secret"))
        ));
    }

    #[test]
    fn get_builds_signed_query_string() {
        let stub = StubTransport::replying(vec![HttpResponse::new(200, "ok")]);
        let mut c = client(&stub);
        c.set_param("api", "ping");
        c.set_param("foo", "b");
        c.set_param("bar", "a");

        assert_eq!(c.get().unwrap(), Some("ok"));

        let expected_sign = "8471ae830c4c37cd2111870e4b83731a";
        let expected_url = format!(
            "http://x/?api=ping&foo=b&bar=a&key=K&sign={expected_sign}&ts={TS}&debug=0"
        );
        assert_eq!(c.last_url(), Some(expected_url.as_str()));
        assert_eq!(*stub.calls.borrow(), vec![Call::Get(expected_url)]);
        assert_eq!(c.last_status(), Some(200));
    }

    #[test]
    fn get_puts_each_parameter_in_query_once() {
        let stub = StubTransport::default();
        let mut c = client(&stub);
        c.set_param("api", "ping");
        c.set_param("ts", "1");
        c.set_param("sign", "forged");
        c.get().unwrap();

        let url = c.last_url().unwrap().to_string();
        let query = url.split_once('?').unwrap().1;
        for name in ["api", "key", "sign", "ts", "debug"] {
            let count = query
                .split('&')
                .filter(|pair| pair.starts_with(&format!("{name}=")))
                .count();
            assert_eq!(count, 1, "{name} should appear exactly once in {query}");
        }
        assert!(query.contains(&format!("ts={TS}")));
        assert!(!query.contains("forged"));
    }

    #[test]
    fn post_sends_form_and_bare_url() {
        let stub = StubTransport::replying(vec![HttpResponse::new(200, "posted")]);
        let mut c = client(&stub);
        c.set_param("api", "ping");
        c.set_param("foo", "b");

        assert_eq!(c.post().unwrap(), Some("posted"));
        assert_eq!(c.last_url(), Some("http://x/"));

        let calls = stub.calls.borrow();
        let Call::Post(url, form) = &calls[0] else {
            panic!("expected POST, got {:?}", calls[0]);
        };
        assert_eq!(url, "http://x/");
        let names: Vec<&str> = form.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, ["api", "foo", "key", "sign", "ts", "debug"]);
        assert!(form.contains(&("ts".to_string(), TS.to_string())));
    }

    #[test]
    fn failed_call_keeps_previous_body() {
        let stub = StubTransport::replying(vec![
            HttpResponse::new(200, "ok"),
            HttpResponse::new(500, "internal error"),
        ]);
        let mut c = client(&stub);
        c.set_param("api", "ping");
        assert_eq!(c.get().unwrap(), Some("ok"));

        c.merge_params(&serde_json::json!({"again": "1"}));
        assert_eq!(c.post().unwrap(), Some("ok"));
        assert_eq!(c.result(), Some("ok"));
        assert_eq!(c.last_status(), Some(500));
    }

    #[test]
    fn non_200_without_prior_success_returns_none() {
        let stub = StubTransport::replying(vec![HttpResponse::new(404, "missing")]);
        let mut c = client(&stub);
        c.set_param("api", "ping");
        assert_eq!(c.get().unwrap(), None);
        assert_eq!(c.last_status(), Some(404));
    }

    #[test]
    fn set_after_response_starts_fresh() {
        let stub = StubTransport::replying(vec![HttpResponse::new(200, "ok")]);
        let mut c = client(&stub);
        c.set_param("api", "ping");
        c.set_param("a", "1");
        c.get().unwrap();

        c.set_param("b", "2");
        let keys: Vec<&str> = c.params().keys().map(String::as_str).collect();
        assert_eq!(keys, ["b"]);
        assert_eq!(c.result(), None);
    }

    #[test]
    fn sending_does_not_leak_system_params_into_store() {
        let stub = StubTransport::default();
        let mut c = client(&stub);
        c.set_param("api", "ping");
        c.get().unwrap();
        assert_eq!(c.params().len(), 1);
        assert_eq!(c.last_request().unwrap().params.len(), 5);
    }

    #[test]
    fn missing_api_fails_before_transport() {
        let stub = StubTransport::default();
        let mut c = client(&stub);
        c.set_param("foo", "b");
        let err = c.get().unwrap_err();
        assert!(matches!(err, ApiError::Sign(SignError::MissingMethodName)));
        assert!(stub.calls.borrow().is_empty());
        assert!(c.last_url().is_none());
    }

    #[test]
    fn transport_failure_propagates() {
        let stub = StubTransport::failing();
        let mut c = client(&stub);
        c.set_param("api", "ping");
        let err = c.post().unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
        assert_eq!(c.last_url(), Some("http://x/"));
        assert_eq!(c.last_status(), None);
    }

    #[test]
    fn debug_flag_is_sent() {
        let stub = StubTransport::default();
        let mut c = SignedClient::new(config().with_debug(true), &stub)
            .unwrap()
            .with_clock(FixedClock(TS));
        c.set_param("api", "ping");
        c.get().unwrap();
        assert!(c.last_url().unwrap().ends_with("&debug=1"));
    }

    #[test]
    fn param_accessors() {
        let stub = StubTransport::default();
        let mut c = client(&stub);
        c.set_param("name", "  bob  ");
        assert_eq!(c.get_param("name").and_then(ParamValue::as_str), Some("bob"));
        c.delete_param("name");
        assert!(c.get_param("name").is_none());
        c.delete_param("name");
    }
}
