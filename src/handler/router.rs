//! Request dispatch module
//!
//! Entry point for HTTP request processing: method and query validation,
//! route target classification, conditional GET, extension dispatch and
//! response assembly. Every branch produces exactly one response.

use chrono::Utc;
use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderMap, HeaderName, CONNECTION, REFERER, USER_AGENT};
use hyper::{Method, Request, Response, StatusCode, Version};
use std::convert::Infallible;
use std::fmt::Write as _;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::config::{AppState, FallbackMode};
use crate::error::ServeError;
use crate::handler::static_files::{self, AssetRequest};
use crate::http::{self, CachePolicy, ContentClass, Freshness};
use crate::logger::{self, AccessLogEntry};
use crate::routing::{RouteMatch, RouteTarget};

const BLANK_PAGE: &str = "<html><body><a href='public/index.html'>index.html</a></body></html>";

/// The parts of an inbound request the dispatcher looks at
#[derive(Debug, Clone)]
pub struct RequestInfo {
    pub method: Method,
    pub uri: String,
    pub version: Version,
    pub headers: HeaderMap,
}

impl RequestInfo {
    pub fn from_request<B>(req: &Request<B>) -> Self {
        Self {
            method: req.method().clone(),
            uri: req.uri().to_string(),
            version: req.version(),
            headers: req.headers().clone(),
        }
    }

    /// Whether the client expects the connection to stay open
    ///
    /// HTTP/1.1 is persistent unless `Connection: close`; HTTP/1.0 only
    /// with `Connection: keep-alive`.
    pub fn is_keep_alive(&self) -> bool {
        let has_token = |token: &str| {
            self.headers
                .get_all(CONNECTION)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .flat_map(|v| v.split(','))
                .any(|t| t.trim().eq_ignore_ascii_case(token))
        };

        match self.version {
            Version::HTTP_09 | Version::HTTP_10 => has_token("keep-alive"),
            _ => !has_token("close"),
        }
    }
}

/// Main entry point for HTTP request handling
pub async fn handle_request<B: Body>(
    req: Request<B>,
    state: Arc<AppState>,
    remote_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let started = Instant::now();
    let info = RequestInfo::from_request(&req);

    logger::log_headers_count(info.headers.len(), state.config.logging.show_headers);

    let route = state.routes.route(req.uri().path(), req.uri().query());
    let response = dispatch(&info, &route, &state).await;

    if let Some(format) = &state.access_log {
        let entry = access_entry(&req, &response, remote_addr, started);
        logger::log_access(&entry, format);
    }

    Ok(response)
}

/// Decide the response for one request and its route match
///
/// `Connection: keep-alive` is only advertised when the transport keeps
/// connections open (`performance.keep_alive_timeout > 0`).
pub async fn dispatch(info: &RequestInfo, route: &RouteMatch, state: &AppState) -> Response<Full<Bytes>> {
    let mut response = decide(info, route, state).await;
    let keep_alive = info.is_keep_alive() && state.config.performance.keep_alive_timeout > 0;
    http::apply_connection(&mut response, keep_alive);
    response
}

async fn decide(info: &RequestInfo, route: &RouteMatch, state: &AppState) -> Response<Full<Bytes>> {
    // 1. Only GET is served
    if info.method != Method::GET {
        logger::log_warning(&format!("Method not allowed: {} {}", info.method, info.uri));
        return http::build_405_response();
    }

    // 2. Any query string is rejected
    if !route.query_params.is_empty() {
        logger::log_debug(&format!("Query parameters rejected: {}", info.uri));
        return http::build_400_response();
    }

    // 3. Static assets, or the fallback page for every other target
    if route.target != RouteTarget::StaticPage {
        return fallback_response(info, route, state);
    }

    match serve_static(info, route, state).await {
        Ok(response) => response,
        Err(ServeError::NotFound) => http::build_404_response(),
        Err(e) => {
            logger::log_error(&format!("Failed to serve {}: {e}", info.uri));
            http::build_500_response()
        }
    }
}

/// Conditional check, then extension dispatch and load
async fn serve_static(
    info: &RequestInfo,
    route: &RouteMatch,
    state: &AppState,
) -> Result<Response<Full<Bytes>>, ServeError> {
    let cfg = &state.config.static_files;
    let id = route.id().unwrap_or(&cfg.index_file);
    let path = static_files::resolve_path(Path::new(&cfg.public_dir), id).await?;

    // 4. Conditional GET
    let validators = match http::check_not_modified(&info.headers, &path).await? {
        Freshness::NotModified(v) => return Ok(http::build_304_response(&v)),
        Freshness::Fresh(v) => v,
    };

    // 5. Extension dispatch
    let asset = AssetRequest {
        id,
        path: &path,
        uri: &info.uri,
        class: ContentClass::from_path(id),
        ascii: static_files::wants_ascii(&info.headers),
    };
    let content = static_files::load_content(asset, &state.cache, cfg.legacy_content_types).await?;

    Ok(http::build_asset_response(
        content.body,
        content.content_type,
        &validators,
        CachePolicy::private(cfg.http_cache_seconds),
        Utc::now(),
    ))
}

/// Response for routes that do not serve static assets
fn fallback_response(info: &RequestInfo, route: &RouteMatch, state: &AppState) -> Response<Full<Bytes>> {
    match state.config.static_files.fallback {
        FallbackMode::Blank => {
            http::build_body_response(StatusCode::OK, "text/html", Bytes::from_static(BLANK_PAGE.as_bytes()))
        }
        FallbackMode::Debug => {
            let body = debug_listing(info, route, state);
            http::build_body_response(StatusCode::OK, "text/plain", Bytes::from(body))
        }
    }
}

/// Plain-text dump of the route table, the request and its match
fn debug_listing(info: &RequestInfo, route: &RouteMatch, state: &AppState) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail
    let _ = writeln!(out, "router:\n{}", state.routes);
    let _ = writeln!(out, "req: {} {} {:?}\n", info.method, info.uri, info.version);
    let _ = writeln!(out, "routeResult:");
    let _ = writeln!(out, "target: {}", route.target);
    let _ = writeln!(out, "pathParams: {:?}", route.path_params);
    let _ = writeln!(out, "queryParams: {:?}\n", route.query_params);
    let _ = write!(out, "allowedMethods: [GET]");
    out
}

fn access_entry<B>(
    req: &Request<B>,
    response: &Response<Full<Bytes>>,
    remote_addr: SocketAddr,
    started: Instant,
) -> AccessLogEntry {
    let header = |name: HeaderName| {
        req.headers()
            .get(&name)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
    };
    let uri = req
        .uri()
        .path_and_query()
        .map_or_else(|| req.uri().path(), |pq| pq.as_str());

    let mut entry = AccessLogEntry::new(remote_addr.ip(), req.method().as_str(), uri);
    entry.version = match req.version() {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        Version::HTTP_3 => "3",
        _ => "1.1",
    };
    entry.status = response.status().as_u16();
    entry.body_bytes = response.body().size_hint().exact().unwrap_or(0);
    entry.referer = header(REFERER);
    entry.user_agent = header(USER_AGENT);
    entry.latency = started.elapsed();
    entry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::http::response::{BODY_400, BODY_404, BODY_405, BODY_500};
    use http_body_util::BodyExt;
    use hyper::header::{ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED};
    use tempfile::TempDir;

    const INDEX: &str = "<html><body>hello</body></html>";
    const PNG: [u8; 6] = [0x89, b'P', b'N', b'G', 0x00, 0xff];

    fn setup(memory_cache: bool, fallback: FallbackMode) -> (TempDir, Arc<AppState>) {
        setup_with(|config| {
            config.static_files.memory_cache = memory_cache;
            config.static_files.fallback = fallback;
        })
    }

    fn setup_with(tweak: impl FnOnce(&mut Config)) -> (TempDir, Arc<AppState>) {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("index.html"), INDEX).unwrap();
        std::fs::write(dir.path().join("photo.png"), PNG).unwrap();
        std::fs::write(dir.path().join("app.js"), "let a = 1;").unwrap();
        std::fs::write(dir.path().join("site.css"), "body { }").unwrap();
        std::fs::write(dir.path().join("notes"), "plain").unwrap();
        std::fs::write(dir.path().join(".secret"), "hidden").unwrap();

        let mut config = Config::default();
        config.logging.access_log = false;
        config.static_files.public_dir = dir.path().to_string_lossy().into_owned();
        tweak(&mut config);
        (dir, Arc::new(AppState::new(&config)))
    }

    fn request(method: Method, uri: &str, headers: &[(HeaderName, &str)]) -> Request<Full<Bytes>> {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(name, *value);
        }
        builder.body(Full::new(Bytes::new())).unwrap()
    }

    async fn send(state: &Arc<AppState>, req: Request<Full<Bytes>>) -> Response<Full<Bytes>> {
        let addr: SocketAddr = "127.0.0.1:40000".parse().unwrap();
        handle_request(req, Arc::clone(state), addr).await.unwrap()
    }

    async fn get(state: &Arc<AppState>, uri: &str) -> Response<Full<Bytes>> {
        send(state, request(Method::GET, uri, &[])).await
    }

    fn header<'a>(resp: &'a Response<Full<Bytes>>, name: &str) -> Option<&'a str> {
        resp.headers().get(name).and_then(|v| v.to_str().ok())
    }

    async fn body(resp: Response<Full<Bytes>>) -> Bytes {
        resp.into_body().collect().await.unwrap().to_bytes()
    }

    #[tokio::test]
    async fn test_non_get_is_405() {
        let (_dir, state) = setup(false, FallbackMode::Debug);
        for method in [Method::POST, Method::PUT, Method::DELETE, Method::HEAD] {
            for uri in ["/public/index.html", "/", "/nowhere?x=1"] {
                let resp = send(&state, request(method.clone(), uri, &[])).await;
                assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED, "{method} {uri}");
                assert_eq!(body(resp).await, BODY_405.as_bytes());
            }
        }
    }

    #[tokio::test]
    async fn test_query_is_400() {
        let (_dir, state) = setup(false, FallbackMode::Debug);
        for uri in ["/anything?x=1", "/public/index.html?v=2", "/?flag"] {
            let resp = get(&state, uri).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(body(resp).await, BODY_400.as_bytes());
        }
    }

    #[tokio::test]
    async fn test_index_page() {
        let (_dir, state) = setup(false, FallbackMode::Debug);
        let resp = get(&state, "/public/index.html").await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(header(&resp, "content-type"), Some("text/html"));
        assert_eq!(header(&resp, "connection"), Some("keep-alive"));
        assert_eq!(header(&resp, "cache-control"), Some("private, max-age=60"));
        assert!(header(&resp, "etag").is_some());
        assert!(header(&resp, "expires").is_some());
        assert_eq!(body(resp).await, INDEX.as_bytes());
    }

    #[tokio::test]
    async fn test_missing_id_serves_index_file() {
        let (_dir, state) = setup(false, FallbackMode::Debug);
        let resp = get(&state, "/public/").await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body(resp).await, INDEX.as_bytes());
    }

    #[tokio::test]
    async fn test_content_types_by_extension() {
        let (_dir, state) = setup(false, FallbackMode::Debug);
        for (uri, content_type) in [
            ("/public/photo.png", "image/jpg"),
            ("/public/app.js", "application/js"),
            ("/public/site.css", "text/css"),
            ("/public/notes", "text/html"),
        ] {
            let resp = get(&state, uri).await;
            assert_eq!(resp.status(), StatusCode::OK, "{uri}");
            assert_eq!(header(&resp, "content-type"), Some(content_type), "{uri}");
        }
    }

    #[tokio::test]
    async fn test_image_bytes_unchanged() {
        let (_dir, state) = setup(false, FallbackMode::Debug);
        let resp = get(&state, "/public/photo.png").await;
        assert_eq!(header(&resp, "content-length"), Some("6"));
        assert_eq!(body(resp).await, &PNG[..]);
    }

    #[tokio::test]
    async fn test_missing_hidden_and_traversal_are_404() {
        let (_dir, state) = setup(false, FallbackMode::Debug);
        let long_name = format!("/public/{}.css", "a".repeat(300));
        for uri in [
            "/public/missing.css",
            "/public/.secret",
            "/public/../index.html",
            "/public/%2e%2e/etc/passwd",
            "/public/index.html/missing.css",
            long_name.as_str(),
        ] {
            let resp = get(&state, uri).await;
            assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{uri}");
            assert_eq!(body(resp).await, BODY_404.as_bytes());
        }
    }

    #[tokio::test]
    async fn test_conditional_get_is_idempotent() {
        let (_dir, state) = setup(false, FallbackMode::Debug);
        let first = get(&state, "/public/site.css").await;
        let etag = header(&first, "etag").unwrap().to_string();
        let last_modified = header(&first, "last-modified").unwrap().to_string();

        let by_etag = send(
            &state,
            request(Method::GET, "/public/site.css", &[(IF_NONE_MATCH, etag.as_str())]),
        )
        .await;
        assert_eq!(by_etag.status(), StatusCode::NOT_MODIFIED);
        assert!(by_etag.headers().get("content-type").is_none());
        assert_eq!(by_etag.headers().get(ETAG).unwrap(), etag.as_str());
        assert!(body(by_etag).await.is_empty());

        let by_date = send(
            &state,
            request(
                Method::GET,
                "/public/site.css",
                &[(IF_MODIFIED_SINCE, last_modified.as_str())],
            ),
        )
        .await;
        assert_eq!(by_date.status(), StatusCode::NOT_MODIFIED);
        assert_eq!(by_date.headers().get(LAST_MODIFIED).unwrap(), last_modified.as_str());
        assert!(body(by_date).await.is_empty());

        // Strict equality: any other validator value is fresh
        let stale = send(
            &state,
            request(Method::GET, "/public/site.css", &[(IF_NONE_MATCH, "\"other\"")]),
        )
        .await;
        assert_eq!(stale.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_connection_header_follows_request() {
        let (_dir, state) = setup(false, FallbackMode::Debug);
        let closing = send(
            &state,
            request(Method::GET, "/public/index.html", &[(CONNECTION, "close")]),
        )
        .await;
        assert_eq!(header(&closing, "connection"), Some("close"));

        let mut req = request(Method::GET, "/public/index.html", &[]);
        *req.version_mut() = Version::HTTP_10;
        assert_eq!(header(&send(&state, req).await, "connection"), Some("close"));

        let mut req = request(Method::GET, "/public/index.html", &[(CONNECTION, "Keep-Alive")]);
        *req.version_mut() = Version::HTTP_10;
        assert_eq!(header(&send(&state, req).await, "connection"), Some("keep-alive"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unreadable_file_is_500() {
        let (dir, state) = setup(false, FallbackMode::Debug);
        // Self-referencing symlink: ELOOP is neither missing nor readable
        let looped = dir.path().join("loop.css");
        std::os::unix::fs::symlink(&looped, &looped).unwrap();

        let resp = get(&state, "/public/loop.css").await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(header(&resp, "content-type"), Some("text/plain"));
        assert_eq!(body(resp).await, BODY_500.as_bytes());
    }

    #[tokio::test]
    async fn test_memory_cache_serves_until_expiry() {
        let (dir, state) = setup_with(|config| {
            config.static_files.memory_cache = true;
            config.static_files.cache_ttl_ms = 200;
        });
        let first = body(get(&state, "/public/index.html").await).await;
        assert_eq!(first, INDEX.as_bytes());
        std::fs::write(dir.path().join("index.html"), "<p>changed</p>").unwrap();

        // Inside the window the cached copy wins over the new file
        let second = body(get(&state, "/public/index.html").await).await;
        assert_eq!(second, INDEX.as_bytes());

        tokio::time::sleep(std::time::Duration::from_millis(300)).await;
        let third = body(get(&state, "/public/index.html").await).await;
        assert_eq!(third, &b"<p>changed</p>"[..]);
        assert_eq!(state.cache.len(), 1);
    }

    #[tokio::test]
    async fn test_keep_alive_disabled_answers_close() {
        let (_dir, state) = setup_with(|config| config.performance.keep_alive_timeout = 0);
        let resp = get(&state, "/public/index.html").await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(header(&resp, "connection"), Some("close"));
    }

    #[tokio::test]
    async fn test_ascii_charset_replaces_non_ascii() {
        let (dir, state) = setup(false, FallbackMode::Debug);
        std::fs::write(dir.path().join("cafe.html"), "caf\u{e9}").unwrap();
        let resp = send(
            &state,
            request(
                Method::GET,
                "/public/cafe.html",
                &[(hyper::header::ACCEPT_CHARSET, "US-ASCII")],
            ),
        )
        .await;
        assert_eq!(body(resp).await, &b"caf?"[..]);
    }

    #[tokio::test]
    async fn test_debug_fallback_lists_match() {
        let (_dir, state) = setup(false, FallbackMode::Debug);
        let resp = get(&state, "/about").await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(header(&resp, "content-type"), Some("text/plain"));
        let text = String::from_utf8(body(resp).await.to_vec()).unwrap();
        assert!(text.contains("target: debug"));
        assert!(text.contains("\"id\": \"about\""));
        assert!(text.contains("allowedMethods: [GET]"));
    }

    #[tokio::test]
    async fn test_blank_fallback_links_index() {
        let (_dir, state) = setup(false, FallbackMode::Blank);
        let resp = get(&state, "/").await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(header(&resp, "content-type"), Some("text/html"));
        assert_eq!(body(resp).await, BLANK_PAGE.as_bytes());
    }

    #[test]
    fn test_keep_alive_detection() {
        let info = |version, connection: Option<&str>| {
            let mut headers = HeaderMap::new();
            if let Some(value) = connection {
                headers.insert(CONNECTION, value.parse().unwrap());
            }
            RequestInfo {
                method: Method::GET,
                uri: "/".to_string(),
                version,
                headers,
            }
        };
        assert!(info(Version::HTTP_11, None).is_keep_alive());
        assert!(!info(Version::HTTP_11, Some("close")).is_keep_alive());
        assert!(!info(Version::HTTP_10, None).is_keep_alive());
        assert!(info(Version::HTTP_10, Some("keep-alive")).is_keep_alive());
    }
}
