//! `grm manifest <dir> [-r]`: write `files_info.txt` for an existing tree.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;

use grm_sync::manifest;

#[derive(Args, Debug)]
pub struct ManifestArgs {
    /// Directory to describe.
    pub dir: PathBuf,

    /// Also write a manifest in every subdirectory.
    #[arg(short, long)]
    pub recursive: bool,
}

impl ManifestArgs {
    pub fn run(self) -> Result<()> {
        if !self.dir.is_dir() {
            bail!("'{}' is not a directory", self.dir.display());
        }
        let written = manifest::generate_tree(&self.dir, self.recursive)
            .with_context(|| format!("failed to write manifests under {}", self.dir.display()))?;
        for path in &written {
            println!("✓ {}", path.display());
        }
        println!("{} manifest(s) written", written.len());
        Ok(())
    }
}
