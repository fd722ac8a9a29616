//! Blocking REST client bound to a single named upstream endpoint.
//!
//! # Design
//! `RestClient` owns the endpoint identity, a persistent header set applied
//! to every request, and the timer/counter pair created from an injected
//! [`MetricsRegistry`]. Each operation resolves the path against the root
//! URL, sends over a shared ureq agent, classifies the final status, and
//! decodes the body through a caller-supplied transformer. Every failure
//! comes back as a [`RestError`] carrying the endpoint name and the resolved
//! URL, and bumps the error counter exactly once.

use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use base64::Engine as _;
use tracing::debug;
use url::Url;

use crate::charset;
use crate::error::{BoxError, RestError};
use crate::metrics::{Counter, MetricsRegistry, Timer, TimerGuard};
use crate::truncate::Truncated;

const DEFAULT_PAYLOAD_LOG_LENGTH: usize = 100;

/// Immutable identity of the upstream service a client targets.
#[derive(Debug)]
struct Endpoint {
    name: String,
    root_url: String,
}

enum Method {
    Get,
    Post,
}

impl Method {
    fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

/// How a status code maps onto body handling.
#[derive(Debug, PartialEq)]
enum ResponseClass {
    /// Success carrying a decodable body.
    WithBody,
    /// A 204 success with nothing to decode.
    NoContent,
    /// 400 and above.
    Failed,
}

fn classify(status: u16) -> ResponseClass {
    if status >= 400 {
        ResponseClass::Failed
    } else if status == 204 {
        ResponseClass::NoContent
    } else {
        ResponseClass::WithBody
    }
}

/// Default transformer: the whole decoded body as one string.
pub fn body_text(body: &str) -> Result<String, Infallible> {
    Ok(body.to_owned())
}

/// Blocking client for one upstream REST endpoint.
///
/// Safe to share across threads: requests run independently, the header set
/// is snapshotted per request, and metrics are atomic.
pub struct RestClient {
    endpoint: Endpoint,
    agent: ureq::Agent,
    headers: RwLock<HashMap<String, String>>,
    payload_log_length: AtomicUsize,
    request_timer: Timer,
    error_counter: Counter,
}

impl RestClient {
    /// Create a client for the endpoint named `name` rooted at `root_url`.
    ///
    /// The timer and error counter are registered under
    /// `restclient.<name>.requests` and `restclient.<name>.errors`.
    pub fn new(name: &str, root_url: &str, metrics: &MetricsRegistry) -> Self {
        // The client classifies statuses itself; 4xx/5xx must come back as
        // data, not transport errors.
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        RestClient {
            endpoint: Endpoint {
                name: name.to_string(),
                root_url: root_url.to_string(),
            },
            agent,
            headers: RwLock::new(HashMap::new()),
            payload_log_length: AtomicUsize::new(DEFAULT_PAYLOAD_LOG_LENGTH),
            request_timer: metrics.timer(&format!("restclient.{name}.requests")),
            error_counter: metrics.counter(&format!("restclient.{name}.errors")),
        }
    }

    /// GET `path` and return the body as text.
    ///
    /// # Panics
    /// Panics if the server answers 204 No Content; use [`RestClient::get`]
    /// when absence is an expected outcome.
    pub fn get_text(&self, path: &str) -> Result<String, RestError> {
        Ok(self.get(path, body_text)?.expect("204 response has no body"))
    }

    /// GET `path`, decoding the body with `transformer`.
    ///
    /// A 204 response yields `Ok(None)` without invoking the transformer.
    pub fn get<T, E, F>(&self, path: &str, transformer: F) -> Result<Option<T>, RestError>
    where
        F: FnOnce(&str) -> Result<T, E>,
        E: Into<BoxError>,
    {
        let timing = self.request_timer.start();
        self.execute(Method::Get, path, None, transformer, &timing)
            .map_err(|err| self.count_error(err))
    }

    /// POST `body` to `path`, decoding the response body as text.
    pub fn post_text(&self, path: &str, body: &str) -> Result<Option<String>, RestError> {
        let timing = self.request_timer.start();
        self.execute(Method::Post, path, Some(body), body_text, &timing)
            .map_err(|err| self.count_error(err))
    }

    /// Set a header sent with every subsequent request. Last write wins.
    pub fn set_header(&self, name: &str, value: &str) {
        let mut headers = self
            .headers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        headers.insert(name.to_string(), value.to_string());
    }

    /// Set the `Authorization` header to `Basic <base64(user:password)>`,
    /// replacing any previous value.
    pub fn set_basic_auth(&self, username: &str, password: &str) {
        let credentials =
            base64::engine::general_purpose::STANDARD.encode(format!("{username}:{password}"));
        self.set_header("Authorization", &format!("Basic {credentials}"));
    }

    /// Cap, in characters, on the body preview in the debug log line.
    pub fn set_payload_log_length(&self, length: usize) {
        self.payload_log_length.store(length, Ordering::Relaxed);
    }

    /// Name this client logs and reports metrics under.
    pub fn endpoint_name(&self) -> &str {
        &self.endpoint.name
    }

    /// Root URL request paths resolve against.
    pub fn root_url(&self) -> &str {
        &self.endpoint.root_url
    }

    /// Timer recording every request round trip.
    pub fn request_timer(&self) -> &Timer {
        &self.request_timer
    }

    /// Counter of failed requests. `errors / requests` is the error rate.
    pub fn error_counter(&self) -> &Counter {
        &self.error_counter
    }

    fn execute<T, E, F>(
        &self,
        method: Method,
        path: &str,
        body: Option<&str>,
        transformer: F,
        timing: &TimerGuard,
    ) -> Result<Option<T>, RestError>
    where
        F: FnOnce(&str) -> Result<T, E>,
        E: Into<BoxError>,
    {
        let url = self.resolve(path)?;
        let mut response = self.send(&method, &url, body)?;
        let status = response.status().as_u16();
        match classify(status) {
            ResponseClass::Failed => Err(self.http_error(&url, &mut response)),
            ResponseClass::NoContent => {
                self.log_response(&method, status, &url, None, timing);
                Ok(None)
            }
            ResponseClass::WithBody => {
                let text = self.read_body(&url, &mut response)?;
                let value = transformer(&text).map_err(|cause| RestError::Parse {
                    endpoint: self.endpoint.name.clone(),
                    url: url.to_string(),
                    source: cause.into(),
                })?;
                self.log_response(&method, status, &url, Some(&text), timing);
                Ok(Some(value))
            }
        }
    }

    /// Resolve `path` against the endpoint root.
    ///
    /// Failures surface as transport errors whose URL context is the naive
    /// concatenation, the best context available before a URL exists.
    fn resolve(&self, path: &str) -> Result<Url, RestError> {
        Url::parse(&self.endpoint.root_url)
            .and_then(|root| root.join(path))
            .map_err(|cause| self.io_error(format!("{}{}", self.endpoint.root_url, path), cause))
    }

    fn send(
        &self,
        method: &Method,
        url: &Url,
        body: Option<&str>,
    ) -> Result<ureq::http::Response<ureq::Body>, RestError> {
        let headers = self.header_snapshot();
        let sent = match method {
            Method::Get => {
                let mut request = self.agent.get(url.as_str());
                for (name, value) in &headers {
                    request = request.header(name.as_str(), value.as_str());
                }
                request.call()
            }
            Method::Post => {
                let mut request = self.agent.post(url.as_str());
                for (name, value) in &headers {
                    request = request.header(name.as_str(), value.as_str());
                }
                request.send(body.unwrap_or_default().as_bytes())
            }
        };
        sent.map_err(|cause| self.io_error(url.to_string(), cause))
    }

    /// Consistent copy of the header set for one request.
    fn header_snapshot(&self) -> HashMap<String, String> {
        self.headers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Read and decode the full response body. Read errors at this stage are
    /// transport failures; only transformer errors are parse failures.
    fn read_body(
        &self,
        url: &Url,
        response: &mut ureq::http::Response<ureq::Body>,
    ) -> Result<String, RestError> {
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let encoding = charset::resolve(content_type.as_deref());
        let bytes = response
            .body_mut()
            .read_to_vec()
            .map_err(|cause| self.io_error(url.to_string(), cause))?;
        Ok(charset::decode(&bytes, encoding))
    }

    /// Build the status failure for a 4xx/5xx response, reading the error
    /// body best-effort into the detail text.
    fn http_error(&self, url: &Url, response: &mut ureq::http::Response<ureq::Body>) -> RestError {
        let status = response.status();
        let detail = response
            .body_mut()
            .read_to_vec()
            .ok()
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned());
        RestError::Http {
            endpoint: self.endpoint.name.clone(),
            url: url.to_string(),
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("").to_string(),
            detail,
        }
    }

    fn io_error(&self, url: String, cause: impl Into<BoxError>) -> RestError {
        RestError::Io {
            endpoint: self.endpoint.name.clone(),
            url,
            source: cause.into(),
        }
    }

    /// Single choke point for the error counter: every returned taxonomy
    /// error passes through here exactly once.
    fn count_error(&self, err: RestError) -> RestError {
        self.error_counter.increment();
        err
    }

    fn log_response(
        &self,
        method: &Method,
        status: u16,
        url: &Url,
        body: Option<&str>,
        timing: &TimerGuard,
    ) {
        let preview_length = self.payload_log_length.load(Ordering::Relaxed);
        debug!(
            endpoint = %self.endpoint.name,
            "{} {} {}ms {} {}",
            method.as_str(),
            status,
            timing.elapsed().as_millis(),
            url,
            Truncated::new(body, preview_length),
        );
    }
}

impl fmt::Debug for RestClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}
