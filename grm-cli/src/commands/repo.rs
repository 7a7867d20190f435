//! `grm add <url>` and `grm remove <url>`

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;

use grm_core::{config, RepositoryRef};

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Repository URL, e.g. https://github.com/<owner>/<repo>.
    pub url: String,
}

#[derive(Args, Debug)]
pub struct RemoveArgs {
    /// Repository URL, e.g. https://github.com/<owner>/<repo>.
    pub url: String,
}

impl AddArgs {
    pub fn run(self, config_path: &Path) -> Result<()> {
        let repo = RepositoryRef::parse_url(&self.url)?;
        let mut cfg = load(config_path)?;

        if !cfg.add_repository(repo.clone()) {
            tracing::info!(repo = %repo, "repository already tracked");
            println!("· '{repo}' is already tracked");
            return Ok(());
        }
        config::save_at(config_path, &cfg)
            .with_context(|| format!("failed to save {}", config_path.display()))?;
        tracing::info!(repo = %repo, "repository added");
        println!("✓ Added '{repo}' as #{}", cfg.repositories.len());
        Ok(())
    }
}

impl RemoveArgs {
    pub fn run(self, config_path: &Path) -> Result<()> {
        let repo = RepositoryRef::parse_url(&self.url)?;
        let mut cfg = load(config_path)?;

        if !cfg.remove_repository(&repo) {
            tracing::info!(repo = %repo, "repository not tracked");
            println!("· '{repo}' is not tracked");
            return Ok(());
        }
        config::save_at(config_path, &cfg)
            .with_context(|| format!("failed to save {}", config_path.display()))?;
        tracing::info!(repo = %repo, "repository removed");
        println!("✓ Removed '{repo}'");
        Ok(())
    }
}

pub(crate) fn load(config_path: &Path) -> Result<config::Config> {
    config::load_or_init_at(config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))
}
