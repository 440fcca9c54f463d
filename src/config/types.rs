// Configuration types module
// Defines all configuration-related data structures

use serde::Deserialize;

use crate::routing::RouteTarget;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    #[serde(default)]
    pub static_files: StaticFilesConfig,
    #[serde(default = "default_routes")]
    pub routes: Vec<RouteConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
            performance: PerformanceConfig::default(),
            static_files: StaticFilesConfig::default(),
            routes: default_routes(),
        }
    }
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            workers: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub access_log: bool,
    pub show_headers: bool,
    /// Access log format (combined, common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "combined".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            access_log: true,
            show_headers: false,
            access_log_format: default_access_log_format(),
            access_log_file: None,
            error_log_file: None,
        }
    }
}

/// Performance configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive_timeout: u64,
    pub read_timeout: u64,
    pub write_timeout: u64,
    pub max_connections: Option<u64>,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            keep_alive_timeout: 75,
            read_timeout: 30,
            write_timeout: 30,
            max_connections: None,
        }
    }
}

/// What the dispatcher answers for routes that are not the static-asset route
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FallbackMode {
    /// Plain-text dump of the route match
    #[default]
    Debug,
    /// Minimal HTML page linking to the index
    Blank,
}

/// Static file serving configuration
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StaticFilesConfig {
    /// Root directory all asset paths are resolved against
    pub public_dir: String,
    /// File served when the route carries no path parameter
    pub index_file: String,
    /// Enable the in-memory response cache
    pub memory_cache: bool,
    /// Expiry window of memory cache entries, in milliseconds
    pub cache_ttl_ms: u64,
    /// Maximum entries per memory cache store
    pub cache_max_entries: usize,
    /// `max-age` and `Expires` offset sent to clients, in seconds
    pub http_cache_seconds: u32,
    /// Serve `image/jpg` for every image and `application/js` for scripts
    pub legacy_content_types: bool,
    pub fallback: FallbackMode,
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            public_dir: "public".to_string(),
            index_file: "index.html".to_string(),
            memory_cache: false,
            cache_ttl_ms: 60_000,
            cache_max_entries: crate::cache::DEFAULT_MAX_ENTRIES,
            http_cache_seconds: 60,
            legacy_content_types: true,
            fallback: FallbackMode::Debug,
        }
    }
}

/// A single route table entry
///
/// Exactly one of `path` (exact match) or `prefix` should be set.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct RouteConfig {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub prefix: Option<String>,
    pub target: RouteTarget,
}

impl RouteConfig {
    pub fn prefix(prefix: &str, target: RouteTarget) -> Self {
        Self {
            path: None,
            prefix: Some(prefix.to_string()),
            target,
        }
    }

    pub fn exact(path: &str, target: RouteTarget) -> Self {
        Self {
            path: Some(path.to_string()),
            prefix: None,
            target,
        }
    }
}

pub fn default_routes() -> Vec<RouteConfig> {
    vec![
        RouteConfig::prefix("/public/", RouteTarget::StaticPage),
        RouteConfig::prefix("/", RouteTarget::Debug),
    ]
}
