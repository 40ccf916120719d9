// Connection handling module
// Serves one accepted TCP connection through the router

use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::Version;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::app::Router;
use crate::config::Config;
use crate::http::HttpResponse;
use crate::logger::{self, AccessLogEntry, AccessLogFormat};

/// Per-server settings shared by every connection
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    /// Upper bound on a connection's lifetime, including stalled requests
    pub timeout: Duration,
    pub charset: Arc<str>,
    /// `None` when access logging is disabled
    pub access_log: Option<AccessLogFormat>,
}

impl ConnectionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            timeout: config.server.timeout_duration(),
            charset: Arc::from(config.server.charset.as_str()),
            access_log: config
                .logging
                .access_log
                .then(|| AccessLogFormat::parse(&config.logging.access_log_format)),
        }
    }
}

/// Serve a connection in a `spawn_local` task.
///
/// Every request on the connection is dispatched through `router`. The whole
/// connection, stalled requests included, is bounded by `settings.timeout`.
/// Must be called from within a `LocalSet`.
///
/// # Arguments
///
/// * `stream` - The accepted TCP stream
/// * `peer_addr` - The peer's socket address, used for access logging
/// * `router` - Router shared by all connections
/// * `settings` - Timeout, charset and access log format
pub fn handle_connection(
    stream: tokio::net::TcpStream,
    peer_addr: SocketAddr,
    router: Arc<Router>,
    settings: Arc<ConnectionSettings>,
) {
    tokio::task::spawn_local(async move {
        let io = TokioIo::new(stream);
        let timeout = settings.timeout;

        let service = service_fn(move |req: hyper::Request<Incoming>| {
            let router = Arc::clone(&router);
            let settings = Arc::clone(&settings);
            async move {
                let response = respond(&router, &settings, peer_addr, &req).await;
                Ok::<_, Infallible>(response)
            }
        });

        let conn = http1::Builder::new().serve_connection(io, service);

        match tokio::time::timeout(timeout, conn).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => logger::log_connection_error(&err),
            Err(_) => logger::log_warning(&format!(
                "Connection from {peer_addr} timed out after {}ms",
                timeout.as_millis()
            )),
        }
    });
}

async fn respond(
    router: &Router,
    settings: &ConnectionSettings,
    peer_addr: SocketAddr,
    req: &hyper::Request<Incoming>,
) -> HttpResponse {
    let started = Instant::now();
    let response = router
        .dispatch(req.method(), req.uri(), &settings.charset)
        .await;

    if let Some(format) = &settings.access_log {
        let mut entry = AccessLogEntry::new(
            peer_addr.to_string(),
            req.method().as_str(),
            req.uri().path(),
        );
        entry.query = req.uri().query().map(ToString::to_string);
        entry.http_version = version_label(req.version()).to_string();
        entry.status = response.status().as_u16();
        entry.body_bytes = body_len(&response);
        entry.user_agent = req
            .headers()
            .get(hyper::header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, format);
    }

    response
}

fn body_len(response: &HttpResponse) -> usize {
    hyper::body::Body::size_hint(response.body())
        .exact()
        .and_then(|len| usize::try_from(len).ok())
        .unwrap_or(0)
}

const fn version_label(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        Version::HTTP_3 => "3",
        _ => "1.1",
    }
}
