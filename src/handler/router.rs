//! Request routing dispatch module
//!
//! Entry point for HTTP request processing. The method and request-target are
//! handed to the path dispatcher as-is; the outcome is framed and logged here.

use crate::config::AppState;
use crate::dispatch;
use crate::http;
use crate::logger::{self, AccessLogEntry};
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{REFERER, USER_AGENT};
use hyper::http::uri::PathAndQuery;
use hyper::{Request, Response, Uri, Version};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible> {
    Ok(respond(&req, &state, peer_addr))
}

/// Dispatch a request against the route table and build the response
pub fn respond<B>(
    req: &Request<B>,
    state: &AppState,
    peer_addr: SocketAddr,
) -> Response<Full<Bytes>> {
    let started = Instant::now();
    let raw_uri = request_target(req.uri());

    let normalized = dispatch::normalize(raw_uri, state.prefix());
    if normalized.malformed_encoding {
        logger::log_warning(&format!(
            "Malformed percent-encoding in '{raw_uri}', undecodable sequences kept literally"
        ));
    }

    let outcome = state.routes.resolve(req.method().as_str(), &normalized.path);
    let status = outcome.status;
    let body_bytes = outcome.body.len();
    let response = http::build_outcome_response(outcome, &state.config.http);

    if state.access_log() {
        let mut entry = AccessLogEntry::new(
            peer_addr.ip().to_string(),
            req.method().to_string(),
            req.uri().path().to_string(),
        );
        entry.query = req.uri().query().map(ToString::to_string);
        entry.http_version = version_label(req.version()).to_string();
        entry.status = status.as_u16();
        entry.body_bytes = body_bytes;
        entry.referer = header_value(req, REFERER);
        entry.user_agent = header_value(req, USER_AGENT);
        entry.request_time_us =
            u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &state.access_log_format);
    }

    response
}

/// Request-target as received: path plus query, never the scheme or authority
fn request_target(uri: &Uri) -> &str {
    uri.path_and_query().map_or_else(|| uri.path(), PathAndQuery::as_str)
}

fn header_value<B>(req: &Request<B>, name: hyper::header::HeaderName) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

fn version_label(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        Version::HTTP_3 => "3",
        _ => "1.1",
    }
}
