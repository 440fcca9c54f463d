// Application state module
// Holds configuration, the route table and the response cache

use super::types::Config;
use crate::cache::ResponseCache;
use crate::logger::AccessLogFormat;
use crate::routing::RouteTable;

/// Application state shared by every connection task
pub struct AppState {
    pub config: Config,
    pub routes: RouteTable,
    pub cache: ResponseCache,
    /// Access log format; `None` when `logging.access_log` is off
    pub access_log: Option<AccessLogFormat>,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
            routes: RouteTable::new(&config.routes),
            cache: ResponseCache::from_config(&config.static_files),
            access_log: config
                .logging
                .access_log
                .then(|| AccessLogFormat::from(config.logging.access_log_format.as_str())),
        }
    }
}
