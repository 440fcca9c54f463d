//! HTTP protocol layer module
//!
//! Conditional-request validation, content classification and response
//! building, decoupled from file loading and routing.

pub mod cache;
pub mod mime;
pub mod response;

// Re-export commonly used types
pub use cache::{check_not_modified, CachePolicy, Freshness, Validators};
pub use mime::ContentClass;
pub use response::{
    apply_connection, build_304_response, build_400_response, build_404_response,
    build_405_response, build_500_response, build_asset_response, build_body_response,
};
