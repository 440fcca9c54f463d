//! Request handler module
//!
//! The dispatcher decides every response; static asset resolution and
//! loading live in their own module.

pub mod router;
pub mod static_files;

// Re-export main entry point
pub use router::handle_request;
