//! Error types for grm-sync.

use std::path::PathBuf;

use thiserror::Error;

use grm_core::ConfigError;

/// All errors that can arise from sync operations.
///
/// Most of these never escape the engine: file-level failures are logged and
/// reported as counts, and release-query failures end only that repository's
/// cycle. The variants exist so internal helpers can use `?` and so the
/// retry loop can classify what went wrong.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An error from the config layer (e.g. an out-of-range force index).
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// Connection, TLS, or body-stream failure.
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[error("request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// Release listing was not the expected JSON shape.
    #[error("malformed release listing: {0}")]
    Json(#[from] serde_json::Error),

    /// A remote-supplied file or tag name that cannot be used as a path component.
    #[error("refusing unsafe path component {name:?}")]
    UnsafeName { name: String },

    /// A spawned task panicked or was aborted.
    #[error("task join failure: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl SyncError {
    /// Transport failures and 5xx responses are worth another attempt;
    /// everything else (4xx included) fails fast.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Http { .. } => true,
            SyncError::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
