//! Route matching module
//!
//! Implements exact and prefix matching over the route table.

use std::collections::BTreeMap;

use super::{RouteMatch, RouteTarget, ID_PARAM};
use crate::config::RouteConfig;

/// Match `path` against `routes`
///
/// Exact routes win over prefix routes; among prefix routes the longest
/// prefix wins. A prefix match binds the rest of the path to `id` unless
/// nothing remains.
pub fn match_route(path: &str, routes: &[RouteConfig]) -> RouteMatch {
    if let Some(route) = routes
        .iter()
        .find(|r| r.path.as_deref().is_some_and(|p| p == path))
    {
        return RouteMatch::new(route.target);
    }

    let best = routes
        .iter()
        .filter(|r| r.path.is_none())
        .filter_map(|r| {
            let prefix = r.prefix.as_deref()?;
            path.strip_prefix(prefix).map(|rest| (prefix.len(), rest, r))
        })
        .max_by_key(|(len, _, _)| *len);

    let Some((_, rest, route)) = best else {
        return RouteMatch::new(RouteTarget::Unmatched);
    };

    let id = rest.trim_start_matches('/');
    let matched = RouteMatch::new(route.target);
    if id.is_empty() {
        matched
    } else {
        matched.with_path_param(ID_PARAM, id)
    }
}

/// Split a raw query string into key/value pairs
///
/// # Examples
/// ```
/// use static_router::routing::parse_query;
/// let params = parse_query("x=1&flag");
/// assert_eq!(params.get("x").map(String::as_str), Some("1"));
/// assert_eq!(params.get("flag").map(String::as_str), Some(""));
/// assert!(parse_query("").is_empty());
/// ```
pub fn parse_query(query: &str) -> BTreeMap<String, String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (k.to_string(), v.to_string()),
            None => (pair.to_string(), String::new()),
        })
        .collect()
}
