//! `grm list`: tracked repositories and what is on disk for each.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use grm_core::{layout, Config};
use grm_sync::{manifest, repository};

use super::repo::load;

#[derive(Args, Debug)]
pub struct ListArgs {}

#[derive(Tabled)]
struct RepoRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "repository")]
    repository: String,
    #[tabled(rename = "versions")]
    versions: usize,
    #[tabled(rename = "size")]
    size: String,
    #[tabled(rename = "local versions")]
    names: String,
}

impl ListArgs {
    pub fn run(self, config_path: &Path) -> Result<()> {
        let cfg = load(config_path)?;

        println!(
            "grm v{} | {} repositories | base dir {}",
            env!("CARGO_PKG_VERSION"),
            cfg.repositories.len(),
            cfg.base_dir.display(),
        );
        if !cfg.proxy_prefix.is_empty() {
            println!("proxy: {}", cfg.proxy_prefix);
        }
        if cfg.repositories.is_empty() {
            println!("No repositories tracked. Run 'grm add <url>' to start.");
            return Ok(());
        }

        let (rows, latest) = build_rows(&cfg)?;
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        for (repo, tag, path) in latest {
            println!("latest {repo}: {tag} -> {}", path.display());
        }
        Ok(())
    }
}

/// `(repository, tag, version dir)` of each repository's newest local version.
type Latest = (String, String, PathBuf);

fn build_rows(cfg: &Config) -> Result<(Vec<RepoRow>, Vec<Latest>)> {
    let mut rows = Vec::with_capacity(cfg.repositories.len());
    let mut latest = Vec::new();
    for (i, repo) in cfg.repositories.iter().enumerate() {
        let dir = layout::repo_dir(&cfg.base_dir, repo);
        let versions = repository::existing_versions(&dir)
            .with_context(|| format!("failed to read {}", dir.display()))?;

        let (size, names) = if versions.is_empty() {
            ("-".to_string(), "not downloaded yet".dimmed().to_string())
        } else {
            let bytes: u64 = versions
                .iter()
                .map(|tag| manifest::directory_size(&dir.join(tag)))
                .sum();
            let names = versions.iter().cloned().collect::<Vec<_>>().join(", ");
            (manifest::format_size(bytes), names)
        };

        if let Some(tag) = latest_version(&dir, &versions) {
            latest.push((repo.to_string(), tag.clone(), dir.join(tag)));
        }
        rows.push(RepoRow {
            index: i + 1,
            repository: repo.to_string(),
            versions: versions.len(),
            size,
            names,
        });
    }
    Ok((rows, latest))
}

/// The most recently modified version directory.
fn latest_version<'a>(dir: &Path, versions: &'a BTreeSet<String>) -> Option<&'a String> {
    versions.iter().max_by_key(|tag| {
        std::fs::metadata(dir.join(tag))
            .and_then(|m| m.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH)
    })
}
