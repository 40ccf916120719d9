//! HTTP response module
//!
//! `Response` is the per-request handle handlers call `send` on. Sending runs
//! the middleware chain and, once it completes, finalizes the payload as JSON
//! or JSONP and hands it to the connection.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderMap, HeaderName, HeaderValue, ALLOW, CONTENT_TYPE};
use hyper::StatusCode;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;

use super::request::Request;
use crate::app::MiddlewareChain;
use crate::logger;

/// The hyper response written back to the client
pub type HttpResponse = hyper::Response<Full<Bytes>>;

/// Mutable response state visible to handlers and middleware
#[derive(Debug, Clone)]
struct ResponseState {
    status: StatusCode,
    headers: HeaderMap,
    body: String,
}

struct Inner {
    request: Arc<Request>,
    chain: MiddlewareChain,
    charset: Arc<str>,
    state: Mutex<ResponseState>,
    /// Set by the first `send`; later sends are ignored
    sending: AtomicBool,
    sink: Mutex<Option<oneshot::Sender<HttpResponse>>>,
}

/// Per-request response handle.
///
/// Cheap to clone; all clones refer to the same response. Nothing is written
/// until `send` is called and every middleware has advanced.
#[derive(Clone)]
pub struct Response {
    inner: Arc<Inner>,
}

impl Response {
    /// Create a response bound to `request`, plus the receiver that yields the
    /// finalized hyper response
    pub(crate) fn new(
        request: Arc<Request>,
        chain: MiddlewareChain,
        charset: &str,
    ) -> (Self, oneshot::Receiver<HttpResponse>) {
        let (tx, rx) = oneshot::channel();
        let inner = Inner {
            request,
            chain,
            charset: Arc::from(charset),
            state: Mutex::new(ResponseState {
                status: StatusCode::OK,
                headers: HeaderMap::new(),
                body: String::new(),
            }),
            sending: AtomicBool::new(false),
            sink: Mutex::new(Some(tx)),
        };

        (Self { inner: Arc::new(inner) }, rx)
    }

    /// Send `payload` with status 200
    pub fn send(&self, payload: impl Into<Value>) {
        self.send_with_status(StatusCode::OK, payload);
    }

    /// Send `payload` with an explicit status.
    ///
    /// Strings and numbers are used verbatim, every other value is serialized
    /// to JSON text. Only the first send of a response takes effect: later
    /// calls are logged and leave status, body and middleware untouched, even
    /// while the first send is still waiting inside the middleware chain.
    pub fn send_with_status(&self, status: StatusCode, payload: impl Into<Value>) {
        if self.inner.sending.swap(true, Ordering::AcqRel) {
            logger::log_warning(&format!(
                "Response for {} already sent, ignoring repeated send",
                self.inner.request.path()
            ));
            return;
        }

        let body = payload_to_body(payload.into());
        {
            let mut state = self.state();
            state.status = status;
            state.body = body;
        }

        let request = Arc::clone(&self.inner.request);
        self.inner.chain.run(
            request,
            self.clone(),
            Box::new(|request: Arc<Request>, response: Response| response.finalize(&request)),
        );
    }

    /// Serialize any `Serialize` value and send it
    pub fn send_serialized<T: Serialize>(&self, status: StatusCode, value: &T) {
        match serde_json::to_value(value) {
            Ok(payload) => self.send_with_status(status, payload),
            Err(e) => {
                logger::log_error(&format!("Failed to serialize response payload: {e}"));
                self.send_with_status(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    serde_json::json!({ "error": true, "message": "500 Internal Server Error" }),
                );
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        self.state().status
    }

    /// Override the status; effective if called before finalization
    pub fn set_status(&self, status: StatusCode) {
        self.state().status = status;
    }

    /// Set an extra response header. `Content-Type` is always replaced at
    /// finalization.
    pub fn insert_header(&self, name: HeaderName, value: HeaderValue) {
        self.state().headers.insert(name, value);
    }

    pub fn header(&self, name: &str) -> Option<HeaderValue> {
        self.state().headers.get(name).cloned()
    }

    /// Body text recorded by the last `send`
    pub fn body(&self) -> String {
        self.state().body.clone()
    }

    /// Whether the response has already been handed to the connection
    pub fn is_finished(&self) -> bool {
        self.inner
            .sink
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    fn state(&self) -> MutexGuard<'_, ResponseState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Write the final status, headers and body. Runs at the end of the chain.
    fn finalize(&self, request: &Request) {
        let sink = self
            .inner
            .sink
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(sink) = sink else {
            return;
        };

        let state = self.state().clone();
        let response = build_payload_response(
            state.status,
            state.headers,
            &state.body,
            request.jsonp_callback(),
            &self.inner.charset,
        );

        // The receiver is gone when the connection was closed first
        if sink.send(response).is_err() {
            logger::log_warning(&format!(
                "Client went away before response for {} was written",
                request.path()
            ));
        }
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("Response")
            .field("path", &self.inner.request.path())
            .field("status", &state.status)
            .field("body", &state.body)
            .finish_non_exhaustive()
    }
}

/// Strings and numbers verbatim, everything else as JSON text
pub fn payload_to_body(payload: Value) -> String {
    match payload {
        Value::String(text) => text,
        other => other.to_string(),
    }
}

/// Wrap a JSON body for script inclusion
pub fn jsonp_body(callback: &str, body: &str) -> String {
    format!("window.{callback} && {callback}({body});")
}

/// Build the final JSON (or JSONP when `callback` is set) response
pub fn build_payload_response(
    status: StatusCode,
    mut headers: HeaderMap,
    body: &str,
    callback: Option<&str>,
    charset: &str,
) -> HttpResponse {
    headers.remove(CONTENT_TYPE);

    let (content_type, body) = match callback {
        Some(callback) => (
            format!("application/javascript; charset={charset}"),
            jsonp_body(callback, body),
        ),
        None => (format!("application/json; charset={charset}"), body.to_string()),
    };

    let mut builder = hyper::Response::builder().status(status);
    if let Some(map) = builder.headers_mut() {
        map.extend(headers);
    }

    builder
        .header(CONTENT_TYPE, content_type)
        .body(Full::new(Bytes::from(body)))
        .unwrap_or_else(|e| {
            log_build_error(status.as_str(), &e);
            hyper::Response::new(Full::new(Bytes::new()))
        })
}

/// Build 405 Method Not Allowed response (no body)
pub fn build_405_response(charset: &str) -> HttpResponse {
    hyper::Response::builder()
        .status(StatusCode::METHOD_NOT_ALLOWED)
        .header(CONTENT_TYPE, format!("text/plain; charset={charset}"))
        .header(ALLOW, "GET")
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|e| {
            log_build_error("405", &e);
            hyper::Response::new(Full::new(Bytes::new()))
        })
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    logger::log_error(&format!("Failed to build {status} response: {error}"));
}
