//! Storage errors

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while touching the backing file
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot store '{key}': {reason}")]
    InvalidEntry { key: String, reason: &'static str },
}
