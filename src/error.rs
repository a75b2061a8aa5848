//! Error types for SiteWatch
//!
//! This module defines all error types used throughout the change-detection
//! engine. Uses `thiserror` for ergonomic error handling with automatic
//! `Display` and `Error` trait implementations.

use thiserror::Error;

/// The primary error type for SiteWatch operations.
#[derive(Error, Debug)]
pub enum WatchError {
    /// Configuration-related errors (invalid values, unreadable config file, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Fetch failures (unreachable host, timeout, non-success status, bad URL).
    /// Recovered per resource; the tick carries on.
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Persisted state exists but cannot be parsed.
    #[error("Corrupt storage: {0}")]
    StorageCorrupt(String),

    /// Persisted state cannot be read or written.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Caller-side misuse (empty resource id, nothing to remove, etc.)
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// Standard I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl WatchError {
    /// Whether this error came from retrieving a resource rather than from
    /// local state.
    pub fn is_fetch(&self) -> bool {
        matches!(self, WatchError::Fetch(_) | WatchError::Http(_))
    }
}

/// A specialized `Result` type for SiteWatch operations.
pub type Result<T> = std::result::Result<T, WatchError>;
