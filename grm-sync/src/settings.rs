//! Read-only snapshot of the configuration used by one sync run.
//!
//! Built once from [`Config`] before any fan-out starts and shared behind an
//! `Arc` by every task; nothing in the engine mutates it.

use std::path::PathBuf;
use std::time::Duration;

use grm_core::{Config, RepositoryRef};

/// Independent concurrency bounds for each fan-out level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncLimits {
    /// Repositories synced at once by a full run.
    pub repositories: usize,
    /// Versions materialized at once within one repository.
    pub versions_per_repository: usize,
    /// Files downloaded at once within one version.
    pub files_per_version: usize,
}

impl Default for SyncLimits {
    fn default() -> Self {
        Self {
            repositories: 5,
            versions_per_repository: 3,
            files_per_version: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSettings {
    pub repositories: Vec<RepositoryRef>,
    pub base_dir: PathBuf,
    pub max_versions: usize,
    pub proxy_prefix: String,
    pub api_base: String,
    /// Total attempts per request, including the first.
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub limits: SyncLimits,
}

impl From<&Config> for SyncSettings {
    fn from(config: &Config) -> Self {
        Self {
            repositories: config.repositories.clone(),
            base_dir: config.base_dir.clone(),
            max_versions: config.max_versions,
            proxy_prefix: config.proxy_prefix.clone(),
            api_base: config.api_base.trim_end_matches('/').to_owned(),
            max_retries: config.max_retries,
            retry_delay: Duration::from_secs(config.retry_delay_secs),
            limits: SyncLimits::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_copies_config_and_default_limits() {
        let mut config = Config::default();
        config.add_repository(RepositoryRef::new("acme", "tool"));
        config.api_base = "https://ghe.example/api/v3/".to_owned();

        let settings = SyncSettings::from(&config);
        assert_eq!(settings.repositories, config.repositories);
        assert_eq!(settings.api_base, "https://ghe.example/api/v3");
        assert_eq!(settings.retry_delay, Duration::from_secs(5));
        assert_eq!(settings.limits, SyncLimits::default());
        assert_eq!(settings.limits.files_per_version, 5);
    }
}
