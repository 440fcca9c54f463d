//! Static router
//!
//! A small HTTP/1.1 static file server. Requests are routed to a typed
//! target, validated, checked against client cache validators and answered
//! from the public directory or an optional in-memory response cache.

pub mod cache;
pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod logger;
pub mod routing;
pub mod server;
