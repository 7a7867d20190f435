//! # grm-sync
//!
//! Release mirroring engine.
//!
//! Build a [`Mirror`] from the loaded config, then call [`Mirror::run`] with
//! a [`SyncScope`]. The fan-out is repository → version → file, each level
//! bounded by its own semaphore (see [`SyncLimits`]). Every finished version
//! directory carries a `files_info.txt` written by [`manifest::generate`].

pub mod error;
pub mod fetcher;
pub mod manifest;
pub mod mirror;
pub mod orchestrator;
pub mod repository;
pub mod settings;
pub mod version;

pub use error::SyncError;
pub use fetcher::AssetFetcher;
pub use mirror::Mirror;
pub use orchestrator::SyncScope;
pub use repository::RepoSyncReport;
pub use settings::{SyncLimits, SyncSettings};
pub use version::{VersionOutcome, VersionStatus};
