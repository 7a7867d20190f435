//! Materialize one release into `<base_dir>/<owner>/<repo>/<tag>/`.
//!
//! Files land in a hidden staging directory first; once every download has
//! settled and the manifest is written, the staging directory is renamed to
//! the tag name. An interrupted run therefore never leaves a directory that
//! later runs would mistake for a finished version.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use grm_core::{layout, ReleaseDescriptor, RepositoryRef};

use crate::error::{io_err, SyncError};
use crate::manifest;
use crate::mirror::Mirror;

/// What happened to one version during a sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionStatus {
    /// The directory already existed and `force` was off; nothing was fetched.
    AlreadyPresent,
    /// Downloads ran; `failed` files are missing from the directory.
    Downloaded { succeeded: usize, failed: usize },
    /// The version could not be materialized at all.
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionOutcome {
    pub tag: String,
    pub status: VersionStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DownloadJob {
    pub url: String,
    pub dest: PathBuf,
}

/// One job per asset plus the source archives. Assets whose names would
/// escape `dir` or collide with the manifest or an in-progress download are
/// dropped and counted in the second tuple element.
pub(crate) fn download_jobs(
    repo: &RepositoryRef,
    release: &ReleaseDescriptor,
    dir: &Path,
) -> (Vec<DownloadJob>, usize) {
    let mut jobs = Vec::with_capacity(release.assets.len() + 2);
    let mut rejected = 0;

    for asset in &release.assets {
        if !layout::is_safe_component(&asset.name) {
            tracing::warn!(repo = %repo, tag = %release.tag, asset = %asset.name, "skipping asset with unsafe name");
            rejected += 1;
            continue;
        }
        if layout::is_reserved_name(&asset.name) {
            tracing::warn!(repo = %repo, tag = %release.tag, asset = %asset.name, "skipping asset that clashes with a mirror file");
            rejected += 1;
            continue;
        }
        jobs.push(DownloadJob {
            url: asset.download_url.clone(),
            dest: dir.join(&asset.name),
        });
    }
    if let Some(url) = &release.source_zip_url {
        jobs.push(DownloadJob {
            url: url.clone(),
            dest: dir.join(layout::source_zip_name(repo, &release.tag)),
        });
    }
    if let Some(url) = &release.source_tar_url {
        jobs.push(DownloadJob {
            url: url.clone(),
            dest: dir.join(layout::source_tar_name(repo, &release.tag)),
        });
    }
    (jobs, rejected)
}

impl Mirror {
    /// Download every file of `release` and write its manifest.
    ///
    /// A present version directory is left alone unless `force` is set, in
    /// which case it is deleted and rebuilt from scratch.
    pub async fn process_version(
        &self,
        repo: &RepositoryRef,
        release: &ReleaseDescriptor,
        force: bool,
    ) -> VersionOutcome {
        let status = match self.try_process_version(repo, release, force).await {
            Ok(status) => status,
            Err(err) => {
                tracing::error!(repo = %repo, tag = %release.tag, error = %err, "version sync failed");
                VersionStatus::Failed {
                    reason: err.to_string(),
                }
            }
        };
        VersionOutcome {
            tag: release.tag.clone(),
            status,
        }
    }

    async fn try_process_version(
        &self,
        repo: &RepositoryRef,
        release: &ReleaseDescriptor,
        force: bool,
    ) -> Result<VersionStatus, SyncError> {
        let tag = release.tag.as_str();
        if !layout::is_safe_component(tag) {
            return Err(SyncError::UnsafeName {
                name: tag.to_owned(),
            });
        }

        let base = &self.settings().base_dir;
        let final_dir = layout::version_dir(base, repo, tag);
        if final_dir.exists() {
            if !force {
                tracing::info!(repo = %repo, tag, "version already present");
                return Ok(VersionStatus::AlreadyPresent);
            }
            tracing::info!(repo = %repo, tag, "force: removing existing version");
            tokio::fs::remove_dir_all(&final_dir)
                .await
                .map_err(|e| io_err(&final_dir, e))?;
        }

        let staging = layout::staging_dir(base, repo, tag);
        if staging.exists() {
            tracing::warn!(path = %staging.display(), "removing staging directory left by an interrupted run");
            tokio::fs::remove_dir_all(&staging)
                .await
                .map_err(|e| io_err(&staging, e))?;
        }
        tokio::fs::create_dir_all(&staging)
            .await
            .map_err(|e| io_err(&staging, e))?;

        let (jobs, rejected) = download_jobs(repo, release, &staging);
        let (succeeded, failed) = self.download_all(jobs).await;
        let failed = failed + rejected;

        let manifest_dir = staging.clone();
        if let Err(err) = tokio::task::spawn_blocking(move || manifest::generate(&manifest_dir)).await? {
            tracing::error!(repo = %repo, tag, error = %err, "failed to write manifest");
        }

        tokio::fs::rename(&staging, &final_dir)
            .await
            .map_err(|e| io_err(&final_dir, e))?;

        if failed > 0 {
            tracing::warn!(repo = %repo, tag, succeeded, failed, "version synced with missing files");
        } else {
            tracing::info!(repo = %repo, tag, files = succeeded, "version synced");
        }
        Ok(VersionStatus::Downloaded { succeeded, failed })
    }

    /// Run every job, at most `files_per_version` at a time, and wait for all
    /// of them. Returns `(succeeded, failed)`.
    async fn download_all(&self, jobs: Vec<DownloadJob>) -> (usize, usize) {
        let limit = Arc::new(Semaphore::new(
            self.settings().limits.files_per_version.max(1),
        ));
        let mut tasks = JoinSet::new();
        for job in jobs {
            let mirror = self.clone();
            let limit = Arc::clone(&limit);
            tasks.spawn(async move {
                let Ok(_permit) = limit.acquire_owned().await else {
                    return false;
                };
                mirror.fetcher().fetch(&job.url, &job.dest).await
            });
        }

        let (mut succeeded, mut failed) = (0, 0);
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(true) => succeeded += 1,
                Ok(false) => failed += 1,
                Err(err) => {
                    tracing::error!(error = %err, "download task did not complete");
                    failed += 1;
                }
            }
        }
        (succeeded, failed)
    }
}
