//! Shared handle threaded through every level of a sync run.

use std::sync::Arc;

use grm_core::Config;

use crate::error::SyncError;
use crate::fetcher::AssetFetcher;
use crate::settings::SyncSettings;

/// Cheap-to-clone handle over the settings snapshot and HTTP fetcher.
///
/// Spawned tasks each hold a clone; the underlying state is immutable.
#[derive(Debug, Clone)]
pub struct Mirror {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    settings: SyncSettings,
    fetcher: AssetFetcher,
}

impl Mirror {
    pub fn new(settings: SyncSettings) -> Result<Self, SyncError> {
        let fetcher = AssetFetcher::new(&settings)?;
        Ok(Self {
            inner: Arc::new(Inner { settings, fetcher }),
        })
    }

    /// Snapshot `config` and build a handle over it.
    pub fn from_config(config: &Config) -> Result<Self, SyncError> {
        Self::new(SyncSettings::from(config))
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.inner.settings
    }

    pub fn fetcher(&self) -> &AssetFetcher {
        &self.inner.fetcher
    }
}
