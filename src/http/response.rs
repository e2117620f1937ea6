//! HTTP response building module
//!
//! Frames a dispatch outcome into a hyper response: status line, headers and
//! body. Building never panics; a builder failure is logged and replaced with
//! a bare response carrying the same body.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, CONTENT_LENGTH, CONTENT_TYPE, SERVER};
use hyper::{Response, StatusCode};

use crate::config::HttpConfig;
use crate::dispatch::Outcome;

/// Build the response for a dispatch outcome
pub fn build_outcome_response(
    outcome: Outcome,
    http_config: &HttpConfig,
) -> Response<Full<Bytes>> {
    build_text_response(
        outcome.status,
        outcome.body,
        &http_config.default_content_type,
        &http_config.server_name,
    )
}

/// Build a response with a fixed body and the standard headers
pub fn build_text_response(
    status: StatusCode,
    body: Bytes,
    content_type: &str,
    server_name: &str,
) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, content_type)
        .header(SERVER, server_name)
        .header(CONTENT_LENGTH, body.len())
        .body(Full::new(body.clone()))
        .unwrap_or_else(|e| {
            log_build_error(status, &e);
            fallback_response(status, body)
        })
}

fn fallback_response(status: StatusCode, body: Bytes) -> Response<Full<Bytes>> {
    let len = body.len();
    let mut resp = Response::new(Full::new(body));
    *resp.status_mut() = status;
    resp.headers_mut().insert(CONTENT_LENGTH, HeaderValue::from(len));
    resp
}

/// Log response build error
fn log_build_error(status: StatusCode, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}
