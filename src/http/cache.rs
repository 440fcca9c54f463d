//! HTTP cache control module
//!
//! Derives `Last-Modified`/`ETag` validators from a file's modification time
//! and evaluates conditional request headers against them.
//!
//! Both comparisons are exact string equality: a client echoing back the
//! values it was given gets a 304, anything else is treated as stale.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use hyper::header::{HeaderMap, HeaderName, IF_MODIFIED_SINCE, IF_NONE_MATCH};
use std::path::Path;
use std::time::SystemTime;
use tokio::fs;

use crate::error::ServeError;

/// RFC 1123 date layout used for `Date`, `Expires` and `Last-Modified`
pub const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Format a timestamp as an HTTP date, truncated to whole seconds
///
/// # Examples
/// ```
/// use chrono::{TimeZone, Utc};
/// use static_router::http::cache::format_http_date;
/// let t = Utc.with_ymd_and_hms(2015, 1, 5, 9, 3, 7).unwrap();
/// assert_eq!(format_http_date(t), "Mon, 05 Jan 2015 09:03:07 GMT");
/// ```
pub fn format_http_date(time: DateTime<Utc>) -> String {
    time.format(HTTP_DATE_FORMAT).to_string()
}

/// Generate the `ETag` for a formatted `Last-Modified` value
///
/// Lowercased base64 of the date string. Reproducible from the timestamp
/// alone; it is not a content hash.
pub fn generate_etag(last_modified: &str) -> String {
    STANDARD.encode(last_modified.as_bytes()).to_lowercase()
}

/// Validator pair derived from one modification timestamp
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validators {
    pub last_modified: String,
    pub etag: String,
}

impl Validators {
    pub fn from_modified(modified: SystemTime) -> Self {
        let last_modified = format_http_date(DateTime::<Utc>::from(modified));
        let etag = generate_etag(&last_modified);
        Self {
            last_modified,
            etag,
        }
    }
}

/// Outcome of a conditional check on an existing file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Freshness {
    /// Client copy is current; answer 304
    NotModified(Validators),
    /// Client needs the full body
    Fresh(Validators),
}

/// Compare request validators with the server's
///
/// `If-None-Match` is checked first; `If-Modified-Since` only when the
/// former did not match.
pub fn evaluate(headers: &HeaderMap, validators: Validators) -> Freshness {
    let header = |name: HeaderName| headers.get(name).and_then(|v| v.to_str().ok());

    if header(IF_NONE_MATCH).is_some_and(|tag| !validators.etag.is_empty() && tag == validators.etag)
    {
        return Freshness::NotModified(validators);
    }

    if header(IF_MODIFIED_SINCE)
        .is_some_and(|since| !since.is_empty() && since == validators.last_modified)
    {
        return Freshness::NotModified(validators);
    }

    Freshness::Fresh(validators)
}

/// Check whether the client's cached copy of `path` is still valid
///
/// Fails with [`ServeError::NotFound`] when the file is missing, hidden or
/// not a regular file.
pub async fn check_not_modified(headers: &HeaderMap, path: &Path) -> Result<Freshness, ServeError> {
    if is_hidden(path) {
        return Err(ServeError::NotFound);
    }

    let metadata = fs::metadata(path)
        .await
        .map_err(|e| ServeError::from_io(path, e))?;
    if !metadata.is_file() {
        return Err(ServeError::NotFound);
    }

    let modified = metadata.modified().map_err(|e| ServeError::from_io(path, e))?;
    Ok(evaluate(headers, Validators::from_modified(modified)))
}

/// Unix convention: a leading dot in the file name
pub fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}

/// Browser-only cache policy for static assets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    max_age: u32,
}

impl CachePolicy {
    /// `private` caching for `max_age` seconds
    pub const fn private(max_age: u32) -> Self {
        Self { max_age }
    }

    /// Convert to Cache-Control header value
    pub fn to_header_value(self) -> String {
        format!("private, max-age={}", self.max_age)
    }

    /// Freshness lifetime used for the `Expires` header
    pub const fn max_age(self) -> u32 {
        self.max_age
    }
}
