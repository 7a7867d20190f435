//! grm core library: domain types, config persistence, mirror layout, errors.
//!
//! - [`types`]: repository references and release descriptors
//! - [`config`]: load / save / mutate the JSON config
//! - [`layout`]: where versions land on disk
//! - [`error`]: [`ConfigError`]

pub mod config;
pub mod error;
pub mod layout;
pub mod types;

pub use config::Config;
pub use error::ConfigError;
pub use types::{ReleaseAsset, ReleaseDescriptor, RepositoryRef};
