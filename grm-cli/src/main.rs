//! grm: mirror GitHub releases of tracked repositories.
//!
//! # Usage
//!
//! ```text
//! grm add <url>
//! grm remove <url>
//! grm update [-f <index>]
//! grm proxy <prefix>
//! grm list
//! grm manifest <dir> [-r]
//! grm help
//! ```

mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use commands::{
    list::ListArgs,
    manifest::ManifestArgs,
    proxy::ProxyArgs,
    repo::{AddArgs, RemoveArgs},
    update::UpdateArgs,
};
use grm_core::config;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "grm",
    version,
    about = "Mirror the releases of tracked GitHub repositories to local storage",
    long_about = None,
)]
struct Cli {
    /// Config file location. Defaults to ~/.grm/config.json.
    #[arg(long, global = true, env = "GRM_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Track a repository, e.g. `grm add https://github.com/sqlmapproject/sqlmap`.
    Add(AddArgs),

    /// Stop tracking a repository. Downloaded versions stay on disk.
    Remove(RemoveArgs),

    /// Download new releases of every tracked repository.
    Update(UpdateArgs),

    /// Set the download proxy prefix; pass "" to disable.
    Proxy(ProxyArgs),

    /// Show tracked repositories and their local versions.
    List(ListArgs),

    /// Write files_info.txt manifests for an existing directory.
    Manifest(ManifestArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = cli.config;
    match cli.command {
        Commands::Add(args) => args.run(&config_path(config)?),
        Commands::Remove(args) => args.run(&config_path(config)?),
        Commands::Update(args) => args.run(&config_path(config)?),
        Commands::Proxy(args) => args.run(&config_path(config)?),
        Commands::List(args) => args.run(&config_path(config)?),
        Commands::Manifest(args) => args.run(),
    }
}

fn config_path(explicit: Option<PathBuf>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path),
        None => config::default_path().context("could not determine config location"),
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
