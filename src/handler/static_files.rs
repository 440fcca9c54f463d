//! Static file serving module
//!
//! Resolves a route's path parameter to a file under the public root and
//! loads it, consulting the response memory cache first.

use hyper::body::Bytes;
use hyper::header::{HeaderMap, ACCEPT_CHARSET};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::fs;

use crate::cache::ResponseCache;
use crate::error::ServeError;
use crate::http::ContentClass;
use crate::logger;

/// Loaded body plus its Content-Type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Content {
    pub body: Bytes,
    pub content_type: &'static str,
}

/// Everything needed to load one asset
#[derive(Debug, Clone, Copy)]
pub struct AssetRequest<'a> {
    /// Path parameter the file was requested by, relative to the public root
    pub id: &'a str,
    /// Resolved on-disk location
    pub path: &'a Path,
    /// Request URI, used as the memory cache key
    pub uri: &'a str,
    pub class: ContentClass,
    /// Encode pages as US-ASCII instead of UTF-8
    pub ascii: bool,
}

/// Map a path parameter to a file under `public_dir`
///
/// Rejects parent/root components, hidden components and anything whose
/// canonical location escapes the public root. Rejections surface as
/// [`ServeError::NotFound`].
pub async fn resolve_path(public_dir: &Path, id: &str) -> Result<PathBuf, ServeError> {
    for component in Path::new(id).components() {
        match component {
            Component::Normal(part) if !part.to_string_lossy().starts_with('.') => {}
            Component::CurDir => {}
            _ => {
                logger::log_warning(&format!("Rejected asset path: '{id}'"));
                return Err(ServeError::NotFound);
            }
        }
    }

    let file_path = public_dir.join(id);

    let root = fs::canonicalize(public_dir).await.map_err(|e| {
        logger::log_warning(&format!(
            "Public directory not found or inaccessible '{}': {e}",
            public_dir.display()
        ));
        ServeError::from_io(public_dir, e)
    })?;

    // File not found is common (404), no need to log it
    let canonical = fs::canonicalize(&file_path)
        .await
        .map_err(|e| ServeError::from_io(&file_path, e))?;
    if !canonical.starts_with(&root) {
        logger::log_warning(&format!(
            "Path traversal attempt blocked: {id} -> {}",
            canonical.display()
        ));
        return Err(ServeError::NotFound);
    }

    Ok(file_path)
}

/// Whether `Accept-Charset` lists `US-ASCII` (case-insensitive)
pub fn wants_ascii(headers: &HeaderMap) -> bool {
    headers
        .get_all(ACCEPT_CHARSET)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|item| item.split(';').next())
        .any(|charset| charset.trim().eq_ignore_ascii_case("US-ASCII"))
}

/// Load an asset, from the memory cache when possible
///
/// Images are served byte-for-byte. Other classes are decoded as UTF-8
/// (invalid sequences replaced) and re-encoded for the response; pages
/// requested as US-ASCII have every non-ASCII character replaced by `?`.
pub async fn load_content(
    req: AssetRequest<'_>,
    cache: &ResponseCache,
    legacy_types: bool,
) -> Result<Content, ServeError> {
    let content_type = req.class.content_type(req.id, legacy_types);

    let body = if req.class.is_text() {
        let text = load_text(&req, cache).await?;
        if req.class == ContentClass::Page && req.ascii {
            Bytes::from(encode_ascii(&text))
        } else {
            Bytes::copy_from_slice(text.as_bytes())
        }
    } else {
        load_bytes(&req, cache).await?
    };

    Ok(Content { body, content_type })
}

async fn load_bytes(req: &AssetRequest<'_>, cache: &ResponseCache) -> Result<Bytes, ServeError> {
    if let Some(hit) = cache.get_bytes(req.uri) {
        logger::log_debug(&format!("[Cache] hit {}", req.uri));
        return Ok(hit);
    }

    let data = Bytes::from(read_file(req.path).await?);
    cache.put_bytes(req.uri, data.clone());
    Ok(data)
}

async fn load_text(req: &AssetRequest<'_>, cache: &ResponseCache) -> Result<Arc<str>, ServeError> {
    if let Some(hit) = cache.get_text(req.uri) {
        logger::log_debug(&format!("[Cache] hit {}", req.uri));
        return Ok(hit);
    }

    let data = read_file(req.path).await?;
    let text: Arc<str> = Arc::from(String::from_utf8_lossy(&data));
    cache.put_text(req.uri, Arc::clone(&text));
    Ok(text)
}

async fn read_file(path: &Path) -> Result<Vec<u8>, ServeError> {
    fs::read(path).await.map_err(|e| ServeError::from_io(path, e))
}

#[allow(clippy::cast_possible_truncation)]
fn encode_ascii(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
        .collect()
}
