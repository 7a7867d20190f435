//! Per-repository sync: query releases, diff against disk, apply retention,
//! dispatch version downloads.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use grm_core::{layout, ReleaseDescriptor, RepositoryRef};

use crate::error::{io_err, SyncError};
use crate::mirror::Mirror;
use crate::version::{VersionOutcome, VersionStatus};

/// Result of syncing one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSyncReport {
    pub repository: RepositoryRef,
    /// The release query failed; nothing else was attempted this cycle.
    pub query_failed: bool,
    pub releases_seen: usize,
    pub versions: Vec<VersionOutcome>,
}

impl RepoSyncReport {
    fn empty(repository: &RepositoryRef) -> Self {
        Self {
            repository: repository.clone(),
            query_failed: false,
            releases_seen: 0,
            versions: vec![],
        }
    }

    /// Versions that went through a download this run.
    pub fn downloaded(&self) -> impl Iterator<Item = &VersionOutcome> {
        self.versions
            .iter()
            .filter(|v| matches!(v.status, VersionStatus::Downloaded { .. }))
    }
}

/// Names of completed version directories under `repo_dir`. Staging
/// directories are excluded; a missing `repo_dir` yields an empty set.
pub fn existing_versions(repo_dir: &Path) -> Result<BTreeSet<String>, SyncError> {
    if !repo_dir.exists() {
        return Ok(BTreeSet::new());
    }
    let entries = std::fs::read_dir(repo_dir).map_err(|e| io_err(repo_dir, e))?;
    Ok(entries
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| !layout::is_staging_name(name))
        .collect())
}

/// Releases to (re)materialize: within the newest `max_versions` tags, and
/// either absent locally or `force` is set. Preserves API order.
pub fn plan_downloads<'a>(
    releases: &'a [ReleaseDescriptor],
    existing: &BTreeSet<String>,
    max_versions: usize,
    force: bool,
) -> Vec<&'a ReleaseDescriptor> {
    releases
        .iter()
        .take(max_versions)
        .filter(|r| force || !existing.contains(&r.tag))
        .collect()
}

impl Mirror {
    /// GET the release list for `repo`, newest first.
    pub async fn list_releases(
        &self,
        repo: &RepositoryRef,
    ) -> Result<Vec<ReleaseDescriptor>, SyncError> {
        let url = format!(
            "{}/repos/{}/{}/releases",
            self.settings().api_base,
            repo.owner,
            repo.name
        );
        let response = self.fetcher().get(&url).await?;
        let body = response
            .bytes()
            .await
            .map_err(|source| SyncError::Http { url, source })?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Sync one repository. Never fails: a query error ends this
    /// repository's cycle with `query_failed` set.
    pub async fn sync_repository(&self, repo: &RepositoryRef, force: bool) -> RepoSyncReport {
        tracing::info!(repo = %repo, force, "checking for updates");
        let mut report = RepoSyncReport::empty(repo);

        let releases = match self.list_releases(repo).await {
            Ok(releases) => releases,
            Err(err) => {
                tracing::error!(repo = %repo, error = %err, "failed to fetch releases");
                report.query_failed = true;
                return report;
            }
        };
        report.releases_seen = releases.len();
        if releases.is_empty() {
            tracing::info!(repo = %repo, "no releases found");
            return report;
        }

        let repo_dir = layout::repo_dir(&self.settings().base_dir, repo);
        let existing = match existing_versions(&repo_dir) {
            Ok(existing) => existing,
            Err(err) => {
                tracing::error!(repo = %repo, error = %err, "failed to scan local versions");
                return report;
            }
        };

        let plan: Vec<ReleaseDescriptor> =
            plan_downloads(&releases, &existing, self.settings().max_versions, force)
                .into_iter()
                .cloned()
                .collect();
        if plan.is_empty() {
            tracing::info!(repo = %repo, "no new versions to download");
            return report;
        }

        tracing::info!(repo = %repo, count = plan.len(), "downloading versions");
        report.versions = self.process_versions(repo, plan, force).await;
        report
    }

    /// Run [`process_version`](Self::process_version) for each release, at
    /// most `versions_per_repository` at a time. Outcomes follow `plan` order.
    async fn process_versions(
        &self,
        repo: &RepositoryRef,
        plan: Vec<ReleaseDescriptor>,
        force: bool,
    ) -> Vec<VersionOutcome> {
        let limit = Arc::new(Semaphore::new(
            self.settings().limits.versions_per_repository.max(1),
        ));
        let mut tasks = JoinSet::new();
        for (index, release) in plan.iter().cloned().enumerate() {
            let mirror = self.clone();
            let repo = repo.clone();
            let limit = Arc::clone(&limit);
            tasks.spawn(async move {
                let outcome = match limit.acquire_owned().await {
                    Ok(_permit) => mirror.process_version(&repo, &release, force).await,
                    Err(err) => VersionOutcome {
                        tag: release.tag.clone(),
                        status: VersionStatus::Failed {
                            reason: err.to_string(),
                        },
                    },
                };
                (index, outcome)
            });
        }

        let mut outcomes: Vec<(usize, VersionOutcome)> = Vec::with_capacity(plan.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(pair) => outcomes.push(pair),
                Err(err) => {
                    tracing::error!(repo = %repo, error = %err, "version task did not complete")
                }
            }
        }
        outcomes.sort_by_key(|(index, _)| *index);
        outcomes.into_iter().map(|(_, outcome)| outcome).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn releases(tags: &[&str]) -> Vec<ReleaseDescriptor> {
        tags.iter()
            .map(|t| ReleaseDescriptor {
                tag: (*t).to_owned(),
                assets: vec![],
                source_zip_url: None,
                source_tar_url: None,
            })
            .collect()
    }

    fn tags(plan: &[&ReleaseDescriptor]) -> Vec<String> {
        plan.iter().map(|r| r.tag.clone()).collect()
    }

    #[test]
    fn plan_respects_retention_window() {
        let all = releases(&["v5", "v4", "v3", "v2", "v1"]);
        let plan = plan_downloads(&all, &BTreeSet::new(), 3, false);
        assert_eq!(tags(&plan), vec!["v5", "v4", "v3"]);
    }

    #[test]
    fn plan_skips_existing_unless_forced() {
        let all = releases(&["v3", "v2", "v1"]);
        let existing: BTreeSet<String> = ["v3".to_owned(), "v1".to_owned()].into();
        assert_eq!(tags(&plan_downloads(&all, &existing, 3, false)), vec!["v2"]);
        assert_eq!(
            tags(&plan_downloads(&all, &existing, 3, true)),
            vec!["v3", "v2", "v1"]
        );
    }

    #[test]
    fn plan_never_reaches_outside_window_even_when_forced() {
        let all = releases(&["v3", "v2", "v1"]);
        let plan = plan_downloads(&all, &BTreeSet::new(), 1, true);
        assert_eq!(tags(&plan), vec!["v3"]);
    }

    #[test]
    fn existing_versions_ignores_files_and_staging_dirs() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("v1")).unwrap();
        std::fs::create_dir(dir.path().join(".v2.partial")).unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();

        let existing = existing_versions(dir.path()).expect("scan");
        assert_eq!(existing, BTreeSet::from(["v1".to_owned()]));
    }

    #[test]
    fn existing_versions_of_missing_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        let existing = existing_versions(&dir.path().join("absent")).expect("scan");
        assert!(existing.is_empty());
    }
}
