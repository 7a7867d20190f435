//! Retrying, streaming HTTP fetch of a single resource.
//!
//! A download is written to a hidden `.<name>.part` sibling and renamed into place only after
//! the body has been fully flushed, so a failed attempt never leaves a
//! truncated file under the final name.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::{Client, Response, Url};
use tokio::io::{AsyncWriteExt, BufWriter};

use grm_core::layout;

use crate::error::{io_err, SyncError};
use crate::settings::SyncSettings;

/// Write buffer size for streamed bodies.
const CHUNK_SIZE: usize = 8 * 1024;

const USER_AGENT: &str = concat!("grm/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct AssetFetcher {
    client: Client,
    proxy_prefix: String,
    api_authority: Option<String>,
    max_retries: u32,
    retry_delay: Duration,
}

impl AssetFetcher {
    pub fn new(settings: &SyncSettings) -> Result<Self, SyncError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(SyncError::Client)?;
        Ok(Self {
            client,
            proxy_prefix: settings.proxy_prefix.clone(),
            api_authority: Url::parse(&settings.api_base).ok().and_then(|u| authority(&u)),
            max_retries: settings.max_retries.max(1),
            retry_delay: settings.retry_delay,
        })
    }

    /// The URL actually requested for `url` once proxy routing is applied.
    pub fn effective_url(&self, url: &str) -> String {
        effective_url(url, &self.proxy_prefix, self.api_authority.as_deref())
    }

    /// Download `url` to `dest`. Returns `false` after the retry budget is
    /// spent; the failure is logged, never raised.
    pub async fn fetch(&self, url: &str, dest: &Path) -> bool {
        let effective = self.effective_url(url);
        match self
            .with_retries(&effective, || self.download_once(&effective, dest))
            .await
        {
            Ok(bytes) => {
                tracing::info!(path = %dest.display(), bytes, "download complete");
                true
            }
            Err(err) => {
                tracing::error!(url, error = %err, "download failed");
                false
            }
        }
    }

    /// GET `url` directly (never proxied), retrying like [`fetch`](Self::fetch).
    pub(crate) async fn get(&self, url: &str) -> Result<Response, SyncError> {
        self.with_retries(url, || self.get_once(url)).await
    }

    async fn with_retries<T, F, Fut>(&self, url: &str, mut op: F) -> Result<T, SyncError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SyncError>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < self.max_retries => {
                    tracing::warn!(
                        url,
                        attempt,
                        max_attempts = self.max_retries,
                        error = %err,
                        "request failed, retrying"
                    );
                    tokio::time::sleep(self.retry_delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn get_once(&self, url: &str) -> Result<Response, SyncError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| SyncError::Http {
                url: url.to_owned(),
                source,
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::Status {
                url: url.to_owned(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    async fn download_once(&self, url: &str, dest: &Path) -> Result<u64, SyncError> {
        let mut response = self.get_once(url).await?;

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_err(parent, e))?;
        }

        let part = part_path(dest);
        match write_body(url, &mut response, &part).await {
            Ok(written) => {
                tokio::fs::rename(&part, dest)
                    .await
                    .map_err(|e| io_err(dest, e))?;
                Ok(written)
            }
            Err(err) => {
                let _ = tokio::fs::remove_file(&part).await;
                Err(err)
            }
        }
    }
}

async fn write_body(url: &str, response: &mut Response, path: &Path) -> Result<u64, SyncError> {
    let file = tokio::fs::File::create(path)
        .await
        .map_err(|e| io_err(path, e))?;
    let mut writer = BufWriter::with_capacity(CHUNK_SIZE, file);
    let mut written = 0u64;

    while let Some(chunk) = response.chunk().await.map_err(|source| SyncError::Http {
        url: url.to_owned(),
        source,
    })? {
        writer.write_all(&chunk).await.map_err(|e| io_err(path, e))?;
        written += chunk.len() as u64;
    }
    writer.flush().await.map_err(|e| io_err(path, e))?;
    Ok(written)
}

fn part_path(dest: &Path) -> PathBuf {
    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    dest.with_file_name(layout::part_file_name(&name))
}

/// `host[:port]` as written in the URL; the port is included only when explicit.
fn authority(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_owned(),
    })
}

/// Apply proxy routing: URLs on the API host go direct, everything else gets
/// `proxy_prefix` prepended once. An empty prefix disables rewriting.
pub fn effective_url(url: &str, proxy_prefix: &str, api_authority: Option<&str>) -> String {
    if proxy_prefix.is_empty() || url.starts_with(proxy_prefix) {
        return url.to_owned();
    }
    let targets_api = Url::parse(url)
        .ok()
        .and_then(|u| authority(&u))
        .is_some_and(|a| Some(a.as_str()) == api_authority);
    if targets_api {
        url.to_owned()
    } else {
        format!("{proxy_prefix}{url}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROXY: &str = "https://g.proxy.example/";
    const API: Option<&str> = Some("api.github.com");

    #[test]
    fn no_prefix_means_no_rewrite() {
        let url = "https://github.com/acme/tool/releases/download/v1/a.zip";
        assert_eq!(effective_url(url, "", API), url);
    }

    #[test]
    fn api_host_is_never_proxied() {
        let url = "https://api.github.com/repos/acme/tool/zipball/v1";
        assert_eq!(effective_url(url, PROXY, API), url);
    }

    #[test]
    fn other_hosts_are_prefixed_once() {
        let url = "https://github.com/acme/tool/releases/download/v1/a.zip";
        let once = effective_url(url, PROXY, API);
        assert_eq!(once, format!("{PROXY}{url}"));
        assert_eq!(effective_url(&once, PROXY, API), once);
    }

    #[test]
    fn api_authority_includes_explicit_port() {
        let api = Url::parse("http://127.0.0.1:8080").unwrap();
        let api = authority(&api);
        let same = "http://127.0.0.1:8080/files/a.bin";
        let other_port = "http://127.0.0.1:9090/files/a.bin";
        assert_eq!(effective_url(same, PROXY, api.as_deref()), same);
        assert_eq!(
            effective_url(other_port, PROXY, api.as_deref()),
            format!("{PROXY}{other_port}")
        );
    }

    #[test]
    fn part_file_is_a_hidden_sibling() {
        assert_eq!(
            part_path(Path::new("/m/acme/tool/v1/a.tar.gz")),
            PathBuf::from("/m/acme/tool/v1/.a.tar.gz.part")
        );
        assert_ne!(part_path(Path::new("/m/x")), PathBuf::from("/m/x.part"));
    }
}
