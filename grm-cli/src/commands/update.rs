//! `grm update [-f <index>]`

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use grm_sync::{Mirror, RepoSyncReport, SyncScope, VersionStatus};

use super::repo::load;

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Re-download the newest versions of the repository at this 1-based
    /// index (as shown by `grm list`), replacing what is on disk.
    #[arg(short, long, value_name = "INDEX")]
    pub force: Option<usize>,
}

impl UpdateArgs {
    pub fn run(self, config_path: &Path) -> Result<()> {
        let cfg = load(config_path)?;
        if cfg.repositories.is_empty() {
            println!("No repositories tracked. Run 'grm add <url>' first.");
            return Ok(());
        }
        if let Some(index) = self.force {
            cfg.repository_at(index)?;
        }

        let mirror = Mirror::from_config(&cfg).context("invalid configuration")?;
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("failed to start async runtime")?;

        let scope = SyncScope::from_force_index(self.force);
        let reports = runtime.block_on(mirror.run(scope))?;
        print_reports(&reports);
        Ok(())
    }
}

fn print_reports(reports: &[RepoSyncReport]) {
    let mut downloaded = 0usize;
    for report in reports {
        if report.query_failed {
            println!("{} {} (release query failed)", "✗".red(), report.repository);
            continue;
        }
        let fresh = report.downloaded().count();
        downloaded += fresh;
        if fresh == 0 && report.versions.iter().all(|v| v.status == VersionStatus::AlreadyPresent) {
            println!("{} {} is up to date", "✓".green(), report.repository);
            continue;
        }

        println!("{} {}", "↻".cyan(), report.repository.to_string().bold());
        for version in &report.versions {
            match &version.status {
                VersionStatus::AlreadyPresent => {}
                VersionStatus::Downloaded { succeeded, failed: 0 } => {
                    println!("    {} {} ({succeeded} files)", "✓".green(), version.tag);
                }
                VersionStatus::Downloaded { succeeded, failed } => {
                    println!(
                        "    {} {} ({succeeded} files, {failed} failed)",
                        "!".yellow(),
                        version.tag
                    );
                }
                VersionStatus::Failed { reason } => {
                    println!("    {} {} ({reason})", "✗".red(), version.tag);
                }
            }
        }
    }
    println!("{downloaded} version(s) downloaded across {} repositories", reports.len());
}
