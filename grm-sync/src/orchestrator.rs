//! Top-level sync entrypoint used by the CLI.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use grm_core::config;

use crate::error::SyncError;
use crate::mirror::Mirror;
use crate::repository::RepoSyncReport;

/// Scope for a sync run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncScope {
    /// Sync every tracked repository, skipping versions already on disk.
    All,
    /// Force-resync the repository at this 1-based index.
    Force(usize),
}

impl SyncScope {
    pub fn from_force_index(force_index: Option<usize>) -> Self {
        force_index.map_or(SyncScope::All, SyncScope::Force)
    }
}

impl Mirror {
    /// Run a sync over `scope`.
    ///
    /// Only an out-of-range force index is an error; everything below the
    /// repository level degrades into the returned reports. Reports follow
    /// tracked-repository order.
    pub async fn run(&self, scope: SyncScope) -> Result<Vec<RepoSyncReport>, SyncError> {
        match scope {
            SyncScope::All => Ok(self.sync_repositories().await),
            SyncScope::Force(index) => {
                let repo = config::tracked_at(&self.settings().repositories, index)?.clone();
                Ok(vec![self.sync_repository(&repo, true).await])
            }
        }
    }

    /// `run(SyncScope::from_force_index(force_index))`.
    pub async fn sync_all(
        &self,
        force_index: Option<usize>,
    ) -> Result<Vec<RepoSyncReport>, SyncError> {
        self.run(SyncScope::from_force_index(force_index)).await
    }

    async fn sync_repositories(&self) -> Vec<RepoSyncReport> {
        let limit = Arc::new(Semaphore::new(self.settings().limits.repositories.max(1)));
        let mut tasks = JoinSet::new();
        for (index, repo) in self.settings().repositories.iter().cloned().enumerate() {
            let mirror = self.clone();
            let limit = Arc::clone(&limit);
            tasks.spawn(async move {
                let report = match limit.acquire_owned().await {
                    Ok(_permit) => mirror.sync_repository(&repo, false).await,
                    Err(_) => RepoSyncReport {
                        repository: repo,
                        query_failed: true,
                        releases_seen: 0,
                        versions: vec![],
                    },
                };
                (index, report)
            });
        }

        let mut reports = Vec::with_capacity(self.settings().repositories.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(pair) => reports.push(pair),
                Err(err) => tracing::error!(error = %err, "repository task did not complete"),
            }
        }
        reports.sort_by_key(|(index, _)| *index);
        reports.into_iter().map(|(_, report)| report).collect()
    }
}
