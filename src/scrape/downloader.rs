// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Concurrent image downloading
//!
//! Every reference becomes a `DownloadJob` named `{index}{ext}` before any
//! network call, so file names never depend on completion order. Jobs run
//! through a bounded pool, each with its own timeout, and stream their body
//! straight to disk. All jobs settle before the aggregate result is reported.

use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use url::Url;

use super::config::ScrapeConfig;
use super::transport::HttpTransport;
use super::types::{DownloadJob, ImageReference, ScrapeError};

const MAX_EXTENSION_LEN: usize = 10;

/// Downloads image references into a directory
pub struct Downloader {
    transport: Arc<dyn HttpTransport>,
    max_concurrent: usize,
    job_timeout: Duration,
    default_extension: String,
}

impl Downloader {
    pub fn new(transport: Arc<dyn HttpTransport>, config: &ScrapeConfig) -> Self {
        Self {
            transport,
            max_concurrent: config.max_concurrent_downloads.max(1),
            job_timeout: config.download_timeout(),
            default_extension: config.default_extension.clone(),
        }
    }

    /// Assign sequence indices and destination paths
    pub fn plan_jobs(&self, images: &[ImageReference], dir: &Path) -> Vec<DownloadJob> {
        images
            .iter()
            .enumerate()
            .map(|(i, image)| {
                let sequence_index = i + 1;
                let extension = derive_extension(&image.absolute_url, &self.default_extension);
                DownloadJob {
                    image: image.clone(),
                    destination: dir.join(format!("{}{}", sequence_index, extension)),
                    sequence_index,
                }
            })
            .collect()
    }

    /// Download every reference into `dir`, creating it if needed
    ///
    /// Returns the written paths in sequence order. Fails if any job fails,
    /// reporting the lowest failing index.
    pub async fn download_all(
        &self,
        images: &[ImageReference],
        dir: &Path,
    ) -> Result<Vec<PathBuf>, ScrapeError> {
        let total = images.len();
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| ScrapeError::Download {
                index: 0,
                url: dir.display().to_string(),
                reason: format!("failed to create directory: {}", e),
                failed: total,
                total,
            })?;

        let jobs = self.plan_jobs(images, dir);
        debug!(
            "Starting {} downloads (max {} concurrent)",
            total, self.max_concurrent
        );

        let mut outcomes: Vec<(DownloadJob, Result<u64, String>)> = stream::iter(jobs)
            .map(|job| async move {
                let result = self.run_job(&job).await;
                (job, result)
            })
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await;
        outcomes.sort_by_key(|(job, _)| job.sequence_index);

        let failed = outcomes.iter().filter(|(_, r)| r.is_err()).count();
        let mut first_failure = None;
        let mut written = Vec::with_capacity(total);
        for (job, result) in outcomes {
            match result {
                Ok(_) => written.push(job.destination),
                Err(reason) => {
                    warn!(
                        "Download {} failed for {}: {}",
                        job.sequence_index, job.image.absolute_url, reason
                    );
                    if first_failure.is_none() {
                        first_failure = Some((job, reason));
                    }
                }
            }
        }

        if let Some((job, reason)) = first_failure {
            return Err(ScrapeError::Download {
                index: job.sequence_index,
                url: job.image.absolute_url,
                reason,
                failed,
                total,
            });
        }

        info!("Downloaded {} images into {}", total, dir.display());
        Ok(written)
    }

    async fn run_job(&self, job: &DownloadJob) -> Result<u64, String> {
        match tokio::time::timeout(self.job_timeout, self.stream_to_file(job)).await {
            Ok(result) => result,
            Err(_) => Err(format!("timed out after {}s", self.job_timeout.as_secs())),
        }
    }

    async fn stream_to_file(&self, job: &DownloadJob) -> Result<u64, String> {
        let response = self
            .transport
            .get(&job.image.absolute_url)
            .await
            .map_err(|e| e.to_string())?;
        if !response.is_success() {
            return Err(format!("HTTP {}", response.status));
        }

        let mut file = tokio::fs::File::create(&job.destination)
            .await
            .map_err(|e| format!("failed to create {}: {}", job.destination.display(), e))?;

        let mut body = response.body;
        let mut written = 0u64;
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| e.to_string())?;
            file.write_all(&chunk)
                .await
                .map_err(|e| format!("write failed: {}", e))?;
            written += chunk.len() as u64;
        }
        file.flush()
            .await
            .map_err(|e| format!("flush failed: {}", e))?;

        debug!(
            "Wrote {} bytes to {}",
            written,
            job.destination.display()
        );
        Ok(written)
    }
}

/// File extension (with leading dot) from the URL path, or `default`
///
/// Only short alphanumeric suffixes are trusted; anything else, including
/// unparseable URLs, falls back to `default`.
pub fn derive_extension(url: &str, default: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|parsed| {
            let file_name = parsed.path_segments()?.last()?.to_string();
            let ext = Path::new(&file_name).extension()?.to_str()?.to_string();
            let valid = !ext.is_empty()
                && ext.len() <= MAX_EXTENSION_LEN
                && ext.chars().all(|c| c.is_ascii_alphanumeric());
            valid.then(|| format!(".{}", ext))
        })
        .unwrap_or_else(|| default.to_string())
}
