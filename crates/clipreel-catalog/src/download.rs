//! Clip downloads.
//!
//! Each clip's storage layout version selects a strategy that turns the
//! clip into a media URL; the body is then streamed to disk. A partially
//! written file is removed when the download fails.

use std::path::Path;

use async_trait::async_trait;
use reqwest::Client;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use clipreel_models::{Clip, SourceVersion};

use crate::error::{CatalogError, CatalogResult};
use crate::metrics::record_download;
use crate::types::{derive_video_url, ResolverResponse};

/// Resolves a clip to the URL of its media body.
#[async_trait]
pub trait DownloadStrategy: Send + Sync {
    /// Strategy name for logging and metrics.
    fn name(&self) -> &'static str;

    /// Whether this strategy handles the clip's layout.
    fn can_handle(&self, clip: &Clip) -> bool;

    /// URL to GET for the clip body.
    async fn resolve(&self, http: &Client, clip: &Clip) -> CatalogResult<String>;
}

/// v1 layout: the media sits next to the thumbnail.
pub struct DirectStrategy;

#[async_trait]
impl DownloadStrategy for DirectStrategy {
    fn name(&self) -> &'static str {
        "direct"
    }

    fn can_handle(&self, clip: &Clip) -> bool {
        clip.source_version == SourceVersion::V1
    }

    async fn resolve(&self, _http: &Client, clip: &Clip) -> CatalogResult<String> {
        clip.video_url
            .clone()
            .or_else(|| derive_video_url(&clip.thumbnail_url))
            .ok_or_else(|| CatalogError::download(&clip.id, "no video url for v1 clip"))
    }
}

/// v2 layout: a lookup service returns the media URL.
pub struct ResolvedStrategy {
    resolver_url: String,
}

impl ResolvedStrategy {
    pub fn new(resolver_url: impl Into<String>) -> Self {
        Self {
            resolver_url: resolver_url.into(),
        }
    }
}

#[async_trait]
impl DownloadStrategy for ResolvedStrategy {
    fn name(&self) -> &'static str {
        "resolved"
    }

    fn can_handle(&self, clip: &Clip) -> bool {
        clip.source_version == SourceVersion::V2
    }

    async fn resolve(&self, http: &Client, clip: &Clip) -> CatalogResult<String> {
        let response = http
            .get(&self.resolver_url)
            .query(&[("id", clip.id.as_str())])
            .send()
            .await
            .map_err(|e| CatalogError::download(&clip.id, format!("resolver request: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::download(
                &clip.id,
                format!("resolver returned {}", status.as_u16()),
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| CatalogError::download(&clip.id, format!("resolver body: {e}")))?;
        let resolved: ResolverResponse = serde_json::from_slice(&bytes)
            .map_err(|e| CatalogError::download(&clip.id, format!("resolver response: {e}")))?;

        resolved
            .data
            .into_iter()
            .next()
            .map(|media| media.video_url)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| CatalogError::download(&clip.id, "resolver returned no media"))
    }
}

/// Fetches a clip body to a local file.
#[async_trait]
pub trait ClipFetcher: Send + Sync {
    /// Write the clip body to `dest`, returning the byte count.
    async fn fetch(&self, clip: &Clip, dest: &Path) -> CatalogResult<u64>;
}

/// Strategy registry plus the streaming writer.
pub struct ClipDownloader {
    http: Client,
    strategies: Vec<Box<dyn DownloadStrategy>>,
}

impl ClipDownloader {
    /// Downloader with the direct and resolved strategies registered.
    pub fn new(http: Client, resolver_url: impl Into<String>) -> Self {
        Self {
            http,
            strategies: vec![
                Box::new(DirectStrategy),
                Box::new(ResolvedStrategy::new(resolver_url)),
            ],
        }
    }

    /// Register an extra strategy; earlier registrations win.
    pub fn with_strategy(mut self, strategy: Box<dyn DownloadStrategy>) -> Self {
        self.strategies.push(strategy);
        self
    }

    fn strategy_for(&self, clip: &Clip) -> Option<&dyn DownloadStrategy> {
        self.strategies
            .iter()
            .find(|s| s.can_handle(clip))
            .map(|s| s.as_ref())
    }

    /// Download one clip to `dest`.
    pub async fn download(&self, clip: &Clip, dest: &Path) -> CatalogResult<u64> {
        let strategy = self.strategy_for(clip).ok_or_else(|| {
            CatalogError::download(&clip.id, format!("no strategy for version {}", clip.source_version))
        })?;

        let result = async {
            let url = strategy.resolve(&self.http, clip).await?;
            debug!(clip_id = %clip.id, strategy = strategy.name(), url = %url, "Downloading clip");
            self.stream_to_file(clip, &url, dest).await
        }
        .await;

        match &result {
            Ok(bytes) => record_download(strategy.name(), true, *bytes),
            Err(e) => {
                warn!(clip_id = %clip.id, strategy = strategy.name(), error = %e, "Clip download failed");
                record_download(strategy.name(), false, 0);
            }
        }
        result
    }

    async fn stream_to_file(&self, clip: &Clip, url: &str, dest: &Path) -> CatalogResult<u64> {
        let mut response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| CatalogError::download(&clip.id, format!("request: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::download(
                &clip.id,
                format!("media returned {}", status.as_u16()),
            ));
        }

        let mut file = File::create(dest)
            .await
            .map_err(|e| CatalogError::download(&clip.id, format!("create {}: {e}", dest.display())))?;

        let written: CatalogResult<u64> = async {
            let mut total = 0u64;
            while let Some(chunk) = response
                .chunk()
                .await
                .map_err(|e| CatalogError::download(&clip.id, format!("body: {e}")))?
            {
                file.write_all(&chunk)
                    .await
                    .map_err(|e| CatalogError::download(&clip.id, format!("write: {e}")))?;
                total += chunk.len() as u64;
            }
            file.flush()
                .await
                .map_err(|e| CatalogError::download(&clip.id, format!("flush: {e}")))?;
            Ok(total)
        }
        .await;
        drop(file);

        if written.is_err() {
            let _ = tokio::fs::remove_file(dest).await;
        }
        written
    }
}

#[async_trait]
impl ClipFetcher for ClipDownloader {
    async fn fetch(&self, clip: &Clip, dest: &Path) -> CatalogResult<u64> {
        self.download(clip, dest).await
    }
}
