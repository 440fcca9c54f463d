//! Error taxonomy for file serving
//!
//! Client errors (bad method, query parameters) never reach this type; they
//! are answered directly by the dispatcher.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failure while validating or loading a static file
#[derive(Debug, Error)]
pub enum ServeError {
    /// File is absent, hidden, not a regular file, or outside the public root
    #[error("file not found")]
    NotFound,

    /// Any other filesystem failure (permissions, I/O fault)
    #[error("failed to access '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ServeError {
    /// Classify an I/O error for `path`
    ///
    /// Errors that only say the path names no file (missing entry, a
    /// regular file used as a directory, an over-long name) become
    /// [`ServeError::NotFound`].
    pub fn from_io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::NotFound
            | io::ErrorKind::NotADirectory
            | io::ErrorKind::InvalidFilename => Self::NotFound,
            _ => Self::Io {
                path: path.into(),
                source,
            },
        }
    }
}
