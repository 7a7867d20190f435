//! Error types for grm-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from configuration and repository-reference handling.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure (permission denied, read-only filesystem, etc.).
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization error (save path).
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// JSON parse error on load, including the file path.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A field holds a value the sync engine cannot work with.
    #[error("invalid config value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },

    /// The argument is not a recognizable GitHub repository URL.
    #[error("not a GitHub repository URL: {0}")]
    InvalidRepositoryUrl(String),

    /// A 1-based repository index outside the tracked set.
    #[error("invalid repository index {index}; {count} repositories are tracked")]
    IndexOutOfRange { index: usize, count: usize },

    /// `dirs::home_dir()` returned `None`, so we cannot locate `~/.grm/`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}
