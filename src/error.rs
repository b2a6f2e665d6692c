//! Error types for session-keeper.

use thiserror::Error;

/// Main error type for session-keeper operations.
///
/// None of these ever surface through the store's mutators; they are
/// returned by the persistence layer and the backends.
#[derive(Error, Debug)]
pub enum SessionKeeperError {
    /// Backend I/O failed for the given key.
    #[error("storage I/O error while {operation} key '{key}': {source}")]
    Storage {
        operation: &'static str,
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// Backend is not able to serve requests.
    #[error("storage backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Persisted subset could not be encoded.
    #[error("failed to serialize session snapshot: {0}")]
    Serialize(#[source] serde_json::Error),

    /// Stored bytes are not a valid session snapshot.
    #[error("failed to deserialize session snapshot: {0}")]
    Deserialize(#[source] serde_json::Error),

    /// Stored snapshot was written with another format version.
    #[error("unsupported snapshot version {found}; expected {expected}")]
    UnsupportedVersion { found: u32, expected: u32 },

    /// The background writer has shut down.
    #[error("persistence writer closed")]
    WriterClosed,

    /// Unknown profile status string.
    #[error("invalid profile status: {0}")]
    InvalidProfileStatus(String),

    /// A user or profile record was not a JSON object.
    #[error("invalid record: {0}")]
    InvalidRecord(String),
}

impl SessionKeeperError {
    #[must_use]
    pub fn storage(operation: &'static str, key: impl Into<String>, source: std::io::Error) -> Self {
        Self::Storage {
            operation,
            key: key.into(),
            source,
        }
    }
}

/// Convenience Result type for session-keeper operations.
pub type Result<T> = std::result::Result<T, SessionKeeperError>;
