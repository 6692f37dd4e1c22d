//! Error types for the library module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while writing reference files.
#[derive(Debug, Error)]
pub enum LibraryError {
    /// The resolved URL was empty.
    #[error("Refusing to write an empty URL for {filename}")]
    EmptyUrl { filename: String },

    /// Failed to create a folder of the target path.
    #[error("Failed to create directory: {path}")]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write the reference file.
    #[error("Failed to write {path}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The duplicate scan task panicked or was cancelled.
    #[error("Library scan failed: {0}")]
    ScanFailed(String),
}

impl LibraryError {
    pub fn directory_creation_failed(path: PathBuf, source: std::io::Error) -> Self {
        Self::DirectoryCreationFailed { path, source }
    }

    pub fn write_failed(path: PathBuf, source: std::io::Error) -> Self {
        Self::WriteFailed { path, source }
    }
}
