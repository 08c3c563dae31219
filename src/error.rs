//! Error types shared across the crate.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by storage, lookup, host and supervisor operations.
///
/// None of these are fatal to a preview session: callers turn them into
/// notices or log lines and carry on.
#[derive(Debug, Error)]
pub enum Error {
    /// The sled settings database could not be opened or written.
    #[error("settings storage error: {0}")]
    Storage(#[from] sled::Error),

    /// The settings blob or a lookup payload was not valid JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A request to the lookup service failed.
    #[error("lookup request failed: {0}")]
    Lookup(#[from] reqwest::Error),

    /// The lookup service answered with a non-success status.
    #[error("lookup service returned HTTP {status}")]
    LookupStatus { status: u16 },

    /// Verse table could not be read.
    #[error("failed to read verse table {}: {source}", .path.display())]
    VerseTable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The lookup service executable does not exist.
    #[error("service executable not found: {}", .path.display())]
    ServiceMissing { path: PathBuf },

    /// The current platform has no service executable.
    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),

    /// Generic io failure (process spawning, permissions, sockets).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The host document refused an operation.
    #[error("host error: {0}")]
    Host(String),

    /// The preview runtime task is gone.
    #[error("preview runtime has shut down")]
    RuntimeClosed,
}

pub type Result<T> = std::result::Result<T, Error>;
