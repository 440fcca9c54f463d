//! Routing module
//!
//! Turns a request URI into a [`RouteMatch`]: a typed target plus the path
//! and query parameters the dispatcher needs. Matching is deliberately
//! narrow:
//! - Exact path routes
//! - Prefix routes binding the remainder of the path to `id`
//! - Query string split into key/value pairs

mod matcher;

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::config::RouteConfig;

pub use matcher::{match_route, parse_query};

/// Name of the path parameter a prefix route binds
pub const ID_PARAM: &str = "id";

/// What a matched route points at
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RouteTarget {
    /// Static assets under the public directory
    StaticPage,
    /// Diagnostic fallback page
    Debug,
    /// No configured route matched
    #[serde(skip)]
    Unmatched,
}

impl fmt::Display for RouteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StaticPage => write!(f, "static_page"),
            Self::Debug => write!(f, "debug"),
            Self::Unmatched => write!(f, "unmatched"),
        }
    }
}

/// Result of matching one request URI; scoped to that request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    pub target: RouteTarget,
    pub path_params: BTreeMap<String, String>,
    pub query_params: BTreeMap<String, String>,
}

impl RouteMatch {
    pub const fn new(target: RouteTarget) -> Self {
        Self {
            target,
            path_params: BTreeMap::new(),
            query_params: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_path_param(mut self, key: &str, value: &str) -> Self {
        self.path_params.insert(key.to_string(), value.to_string());
        self
    }

    /// The `id` path parameter, if the route bound one
    pub fn id(&self) -> Option<&str> {
        self.path_params.get(ID_PARAM).map(String::as_str)
    }
}

/// Configured routes, matched in priority order
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<RouteConfig>,
}

impl RouteTable {
    pub fn new(routes: &[RouteConfig]) -> Self {
        Self {
            routes: routes.to_vec(),
        }
    }

    /// Match a path and optional raw query string
    pub fn route(&self, path: &str, query: Option<&str>) -> RouteMatch {
        let mut matched = match_route(path, &self.routes);
        if let Some(query) = query {
            matched.query_params = parse_query(query);
        }
        matched
    }
}

impl fmt::Display for RouteTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for route in &self.routes {
            match (&route.path, &route.prefix) {
                (Some(path), _) => writeln!(f, "GET {path} => {}", route.target)?,
                (None, Some(prefix)) => writeln!(f, "GET {prefix}:*{ID_PARAM} => {}", route.target)?,
                (None, None) => {}
            }
        }
        writeln!(f, "* => {}", RouteTarget::Unmatched)
    }
}
