//! HTTP response building module
//!
//! Provides builders for every status the dispatcher can answer with.
//! Builders never fail: a rejected header is logged and the response is
//! rebuilt without it.

use chrono::{DateTime, TimeDelta, Utc};
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{
    HeaderValue, CACHE_CONTROL, CONNECTION, CONTENT_LENGTH, CONTENT_TYPE, DATE, ETAG, EXPIRES,
    LAST_MODIFIED,
};
use hyper::{Response, StatusCode};

use super::cache::{format_http_date, CachePolicy, Validators};

pub const BODY_400: &str = "400 Bad request";
pub const BODY_404: &str = "404 File not Found";
pub const BODY_405: &str = "405 Request method is not GET";
pub const BODY_500: &str = "500 Internal Server Error";

/// Build a response with an explicit Content-Type and Content-Length
pub fn build_body_response(
    status: StatusCode,
    content_type: &str,
    body: Bytes,
) -> Response<Full<Bytes>> {
    let content_length = body.len();
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, content_type)
        .header(CONTENT_LENGTH, content_length)
        .body(Full::new(body.clone()))
        .unwrap_or_else(|e| {
            log_build_error(status.as_str(), &e);
            fallback_response(status, body)
        })
}

/// Build a plain-text response
pub fn build_text_response(status: StatusCode, body: &'static str) -> Response<Full<Bytes>> {
    build_body_response(status, "text/plain", Bytes::from_static(body.as_bytes()))
}

/// Build 400 Bad Request response
pub fn build_400_response() -> Response<Full<Bytes>> {
    build_text_response(StatusCode::BAD_REQUEST, BODY_400)
}

/// Build 404 Not Found response
pub fn build_404_response() -> Response<Full<Bytes>> {
    build_text_response(StatusCode::NOT_FOUND, BODY_404)
}

/// Build 405 Method Not Allowed response
pub fn build_405_response() -> Response<Full<Bytes>> {
    build_text_response(StatusCode::METHOD_NOT_ALLOWED, BODY_405)
}

/// Build 500 Internal Server Error response
pub fn build_500_response() -> Response<Full<Bytes>> {
    build_text_response(StatusCode::INTERNAL_SERVER_ERROR, BODY_500)
}

/// Build 304 Not Modified response (empty body, no Content-Type)
pub fn build_304_response(validators: &Validators) -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::NOT_MODIFIED)
        .header(ETAG, validators.etag.as_str())
        .header(LAST_MODIFIED, validators.last_modified.as_str())
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|e| {
            log_build_error("304", &e);
            fallback_response(StatusCode::NOT_MODIFIED, Bytes::new())
        })
}

/// Build 200 response for a static asset with freshness headers
///
/// `Date` is `now`, `Expires` is `now` plus the policy's max-age, and
/// `Last-Modified`/`ETag` come from the same validators the conditional
/// check used.
pub fn build_asset_response(
    body: Bytes,
    content_type: &str,
    validators: &Validators,
    policy: CachePolicy,
    now: DateTime<Utc>,
) -> Response<Full<Bytes>> {
    let content_length = body.len();
    let expires = now + TimeDelta::seconds(i64::from(policy.max_age()));

    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, content_type)
        .header(CONTENT_LENGTH, content_length)
        .header(DATE, format_http_date(now))
        .header(EXPIRES, format_http_date(expires))
        .header(CACHE_CONTROL, policy.to_header_value())
        .header(LAST_MODIFIED, validators.last_modified.as_str())
        .header(ETAG, validators.etag.as_str())
        .body(Full::new(body.clone()))
        .unwrap_or_else(|e| {
            log_build_error("200", &e);
            fallback_response(StatusCode::OK, body)
        })
}

/// Set the `Connection` header for the transport
///
/// `keep-alive` when the client asked for a persistent connection,
/// otherwise `close` so the connection is shut after the flush.
pub fn apply_connection(response: &mut Response<Full<Bytes>>, keep_alive: bool) {
    let value = if keep_alive { "keep-alive" } else { "close" };
    response
        .headers_mut()
        .insert(CONNECTION, HeaderValue::from_static(value));
}

/// Bare response used when a builder rejects a header
fn fallback_response(status: StatusCode, body: Bytes) -> Response<Full<Bytes>> {
    let content_length = HeaderValue::from(body.len());
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    if status != StatusCode::NOT_MODIFIED {
        response.headers_mut().insert(CONTENT_LENGTH, content_length);
    }
    response
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}
