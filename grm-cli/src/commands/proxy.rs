//! `grm proxy <prefix>`

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;

use grm_core::config;

use super::repo::load;

#[derive(Args, Debug)]
pub struct ProxyArgs {
    /// Prefix prepended to download URLs (e.g. https://ghproxy.example/). Empty disables.
    pub prefix: String,
}

impl ProxyArgs {
    pub fn run(self, config_path: &Path) -> Result<()> {
        let mut cfg = load(config_path)?;
        cfg.set_proxy_prefix(self.prefix.trim());
        config::save_at(config_path, &cfg)
            .with_context(|| format!("failed to save {}", config_path.display()))?;

        tracing::info!(prefix = %cfg.proxy_prefix, "proxy prefix set");
        if cfg.proxy_prefix.is_empty() {
            println!("✓ Proxy disabled");
        } else {
            println!("✓ Proxy prefix set to {}", cfg.proxy_prefix);
        }
        Ok(())
    }
}
