//! Configurable HTTP stub server for exercising REST clients in tests.
//!
//! # Design
//! No routes are declared up front: a fallback handler answers every request
//! from a [`StubRegistry`] of canned responses keyed by path, and records
//! what arrived so tests can assert on delivered headers and bodies.
//! [`StubServer::start`] serves the router over a real socket on an
//! OS-assigned port, from a detached thread running a current-thread
//! runtime.

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;

use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::Response;
use axum::Router;
use tokio::net::TcpListener;

/// Canned response served for a stubbed path.
#[derive(Clone, Debug)]
pub struct StubResponse {
    status: StatusCode,
    headers: Vec<(HeaderName, HeaderValue)>,
    body: Vec<u8>,
}

impl StubResponse {
    /// Response with the given status code and an empty body.
    ///
    /// # Panics
    /// Panics if `status` is not a valid HTTP status code.
    pub fn new(status: u16) -> Self {
        StubResponse {
            status: StatusCode::from_u16(status).expect("valid status code"),
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Add a response header.
    ///
    /// # Panics
    /// Panics if `name` or `value` is not valid for an HTTP header.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        let name = HeaderName::try_from(name).expect("valid header name");
        let value = HeaderValue::try_from(value).expect("valid header value");
        self.headers.push((name, value));
        self
    }

    /// Set the response body.
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        for (name, value) in self.headers {
            response.headers_mut().insert(name, value);
        }
        response
    }
}

/// One request exactly as the server received it.
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    /// Value of the header `name`, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(stored, _)| stored.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Body interpreted as UTF-8, with invalid sequences replaced.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Shared stub configuration and request log behind the router.
///
/// Clones share state, so a registry handed to [`app`] can still be
/// inspected and reconfigured from the test.
#[derive(Clone, Debug, Default)]
pub struct StubRegistry {
    inner: Arc<Mutex<RegistryState>>,
}

#[derive(Debug, Default)]
struct RegistryState {
    stubs: HashMap<String, StubResponse>,
    received: Vec<RecordedRequest>,
}

impl StubRegistry {
    /// Register the canned response served for `path`, replacing any
    /// previous stub for the same path.
    pub fn stub(&self, path: &str, response: StubResponse) {
        self.lock().stubs.insert(path.to_string(), response);
    }

    /// Every request received so far, in arrival order.
    pub fn received(&self) -> Vec<RecordedRequest> {
        self.lock().received.clone()
    }

    fn record(&self, request: RecordedRequest) {
        self.lock().received.push(request);
    }

    fn lookup(&self, path: &str) -> Option<StubResponse> {
        self.lock().stubs.get(path).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Router answering every request from the registry's stubs.
pub fn app(registry: StubRegistry) -> Router {
    Router::new().fallback(respond).with_state(registry)
}

async fn respond(State(registry): State<StubRegistry>, request: Request) -> Response {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let headers = request
        .headers()
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();
    let body = to_bytes(request.into_body(), usize::MAX)
        .await
        .unwrap_or_default()
        .to_vec();

    registry.record(RecordedRequest {
        method,
        path: path.clone(),
        headers,
        body,
    });

    match registry.lookup(&path) {
        Some(stub) => stub.into_response(),
        None => {
            let mut response = Response::new(Body::empty());
            *response.status_mut() = StatusCode::NOT_FOUND;
            response
        }
    }
}

/// A live stub server bound to an OS-assigned local port.
pub struct StubServer {
    addr: SocketAddr,
    registry: StubRegistry,
}

impl StubServer {
    /// Bind `127.0.0.1:0` and serve a fresh registry on a detached thread.
    pub fn start() -> io::Result<StubServer> {
        let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
        let addr = listener.local_addr()?;
        listener.set_nonblocking(true)?;

        let registry = StubRegistry::default();
        let router = app(registry.clone());
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let listener = {
            let _guard = runtime.enter();
            TcpListener::from_std(listener)?
        };
        thread::spawn(move || {
            // Serves until the test process exits.
            let _ = runtime.block_on(async { axum::serve(listener, router).await });
        });

        Ok(StubServer { addr, registry })
    }

    /// Base URL of the running server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Address the server is listening on.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Register the canned response served for `path`.
    pub fn stub(&self, path: &str, response: StubResponse) {
        self.registry.stub(path, response);
    }

    /// Every request received so far, in arrival order.
    pub fn received(&self) -> Vec<RecordedRequest> {
        self.registry.received()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_response_carries_status_headers_and_body() {
        let response = StubResponse::new(201)
            .with_header("Content-Type", "text/plain")
            .with_body("created")
            .into_response();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            response.headers().get("content-type").unwrap().to_str().unwrap(),
            "text/plain"
        );
    }

    #[test]
    fn registry_serves_the_latest_stub_for_a_path() {
        let registry = StubRegistry::default();
        registry.stub("/a", StubResponse::new(200));
        registry.stub("/a", StubResponse::new(418));

        let stub = registry.lookup("/a").unwrap();
        assert_eq!(stub.status, StatusCode::IM_A_TEAPOT);
    }

    #[test]
    fn recorded_header_lookup_is_case_insensitive() {
        let request = RecordedRequest {
            method: "GET".to_string(),
            path: "/x".to_string(),
            headers: vec![("accept".to_string(), "application/json".to_string())],
            body: Vec::new(),
        };

        assert_eq!(request.header("Accept"), Some("application/json"));
        assert_eq!(request.header("authorization"), None);
    }

    #[test]
    fn body_text_replaces_invalid_utf8() {
        let request = RecordedRequest {
            method: "POST".to_string(),
            path: "/x".to_string(),
            headers: Vec::new(),
            body: vec![0x68, 0x69, 0xFF],
        };

        assert_eq!(request.body_text(), "hi\u{FFFD}");
    }
}
