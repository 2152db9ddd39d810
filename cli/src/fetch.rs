use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::debug;

use menuseed_core::backend::Fetcher;
use menuseed_core::error::{StoreError, StoreResult};

/// Downloader for source images: HTTP(S) GET, or a copy for `file://` URLs.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!("menuseed/{}", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(30))
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn download(&self, url: &str, dest: &Path) -> StoreResult<PathBuf> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        if let Some(source) = url.strip_prefix("file://") {
            let bytes = tokio::fs::copy(source, dest).await?;
            debug!(url, bytes, path = %dest.display(), "copied");
            return Ok(dest.to_path_buf());
        }

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        tokio::fs::write(dest, &bytes).await?;
        debug!(url, bytes = bytes.len(), path = %dest.display(), "downloaded");
        Ok(dest.to_path_buf())
    }
}
