//! Persistent sync configuration.
//!
//! # Storage layout
//!
//! ```text
//! ~/.grm/
//!   config.json    (created with defaults on first load)
//! ```
//!
//! # API pattern
//!
//! File-touching functions come in two forms:
//! - `fn_at(path: &Path, …)`: explicit location; used in tests with `TempDir`
//! - `fn(…)`: derives the location from `dirs::home_dir()`, delegates to `_at`
//!
//! Mutation helpers on [`Config`] only change the in-memory value; callers
//! persist with [`save_at`] immediately afterwards.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{io_err, ConfigError};
use crate::types::RepositoryRef;

pub const DEFAULT_API_BASE: &str = "https://api.github.com";
pub const DEFAULT_BASE_DIR: &str = "downloads";
pub const DEFAULT_MAX_VERSIONS: usize = 3;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 5;

// ---------------------------------------------------------------------------
// 1. Config document
// ---------------------------------------------------------------------------

/// The whole configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Tracked repositories in insertion order; display index is 1-based.
    #[serde(default)]
    pub repositories: Vec<RepositoryRef>,
    /// Root of the mirror tree. Relative paths resolve against the working directory.
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,
    /// Retention window: only the newest `max_versions` tags are synced.
    #[serde(default = "default_max_versions")]
    pub max_versions: usize,
    /// Prepended to non-API download URLs. Empty disables proxying.
    #[serde(default)]
    pub proxy_prefix: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Total attempts per download, including the first.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            repositories: vec![],
            base_dir: default_base_dir(),
            max_versions: DEFAULT_MAX_VERSIONS,
            proxy_prefix: String::new(),
            api_base: default_api_base(),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay_secs: DEFAULT_RETRY_DELAY_SECS,
        }
    }
}

fn default_base_dir() -> PathBuf {
    PathBuf::from(DEFAULT_BASE_DIR)
}

fn default_max_versions() -> usize {
    DEFAULT_MAX_VERSIONS
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_owned()
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_retry_delay_secs() -> u64 {
    DEFAULT_RETRY_DELAY_SECS
}

impl Config {
    /// Append `repo` unless it is already tracked. Returns `true` if added.
    pub fn add_repository(&mut self, repo: RepositoryRef) -> bool {
        if self.repositories.contains(&repo) {
            return false;
        }
        self.repositories.push(repo);
        true
    }

    /// Remove `repo` if tracked. Returns `true` if removed.
    pub fn remove_repository(&mut self, repo: &RepositoryRef) -> bool {
        let before = self.repositories.len();
        self.repositories.retain(|r| r != repo);
        self.repositories.len() != before
    }

    pub fn set_proxy_prefix(&mut self, prefix: impl Into<String>) {
        self.proxy_prefix = prefix.into();
    }

    /// Resolve a 1-based display index. See [`tracked_at`].
    pub fn repository_at(&self, index: usize) -> Result<&RepositoryRef, ConfigError> {
        tracked_at(&self.repositories, index)
    }

    /// Reject values the sync engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_versions == 0 {
            return Err(ConfigError::Invalid {
                field: "max_versions",
                reason: "must be at least 1".to_owned(),
            });
        }
        if self.max_retries == 0 {
            return Err(ConfigError::Invalid {
                field: "max_retries",
                reason: "must be at least 1".to_owned(),
            });
        }
        if self.api_base.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "api_base",
                reason: "must not be empty".to_owned(),
            });
        }
        Ok(())
    }
}

/// Resolve a 1-based display index into `repositories`.
pub fn tracked_at(
    repositories: &[RepositoryRef],
    index: usize,
) -> Result<&RepositoryRef, ConfigError> {
    index
        .checked_sub(1)
        .and_then(|i| repositories.get(i))
        .ok_or(ConfigError::IndexOutOfRange {
            index,
            count: repositories.len(),
        })
}

// ---------------------------------------------------------------------------
// 2. Paths
// ---------------------------------------------------------------------------

/// `<home>/.grm/config.json`: pure, no I/O.
pub fn default_path_at(home: &Path) -> PathBuf {
    home.join(".grm").join("config.json")
}

/// `default_path_at` convenience wrapper.
pub fn default_path() -> Result<PathBuf, ConfigError> {
    Ok(default_path_at(&home()?))
}

// ---------------------------------------------------------------------------
// 3. Load
// ---------------------------------------------------------------------------

/// Load the config at `path`, creating and persisting defaults if absent.
///
/// Returns `ConfigError::Parse` (with path) for malformed JSON and
/// `ConfigError::Invalid` for out-of-range values.
pub fn load_or_init_at(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        let config = Config::default();
        save_at(path, &config)?;
        return Ok(config);
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    let config: Config = serde_json::from_str(&contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;
    config.validate()?;
    Ok(config)
}

/// `load_or_init_at` convenience wrapper.
pub fn load_or_init() -> Result<Config, ConfigError> {
    load_or_init_at(&default_path()?)
}

// ---------------------------------------------------------------------------
// 4. Save (atomic)
// ---------------------------------------------------------------------------

/// Atomically save the config to `path`.
///
/// Write flow: serialize → `.json.tmp` sibling → `rename`. The `.tmp` file is
/// always in the same directory as the target, so the rename never crosses
/// filesystems.
pub fn save_at(path: &Path, config: &Config) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
    }
    let json = serde_json::to_string_pretty(config)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}

/// `save_at` convenience wrapper.
pub fn save(config: &Config) -> Result<(), ConfigError> {
    save_at(&default_path()?, config)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
