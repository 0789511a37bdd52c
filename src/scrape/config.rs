// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Configuration for product image scraping
//!
//! Defines the relevance marker, download limits, timeouts and archive settings.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the scrape pipeline
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    /// Substring an image `src` must contain to be harvested (default: "product")
    pub marker: String,
    /// Extension used when the image URL has none (default: ".png")
    pub default_extension: String,
    /// Parent directory for per-request working directories
    pub work_root: PathBuf,
    /// Maximum downloads in flight per request (default: 8)
    pub max_concurrent_downloads: usize,
    /// Timeout for the listing page fetch in seconds (default: 15)
    pub page_timeout_secs: u64,
    /// Timeout per image download in seconds (default: 30)
    pub download_timeout_secs: u64,
    /// Maximum listing page size in bytes (default: 10 MiB)
    pub max_page_bytes: usize,
    /// Deflate level for archive entries, 0-9 (default: 9)
    pub compression_level: i32,
    /// Archive chunks buffered ahead of the consumer (default: 16)
    pub stream_buffer_chunks: usize,
    /// Size of each archive chunk handed to the consumer (default: 64 KiB)
    pub chunk_size: usize,
    /// User agent sent with every request
    pub user_agent: String,
}

impl ScrapeConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            marker: env::var("SCRAPE_IMAGE_MARKER")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.marker),
            work_root: env::var("SCRAPE_WORK_DIR")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.work_root),
            max_concurrent_downloads: env::var("SCRAPE_MAX_CONCURRENT_DOWNLOADS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_concurrent_downloads),
            page_timeout_secs: env::var("SCRAPE_PAGE_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.page_timeout_secs),
            download_timeout_secs: env::var("SCRAPE_DOWNLOAD_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.download_timeout_secs),
            max_page_bytes: env::var("SCRAPE_MAX_PAGE_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_page_bytes),
            user_agent: env::var("SCRAPE_USER_AGENT")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.user_agent),
            ..defaults
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.marker.is_empty() {
            return Err("marker cannot be empty".to_string());
        }
        if !self.default_extension.starts_with('.') || self.default_extension.len() < 2 {
            return Err("default_extension must look like \".png\"".to_string());
        }
        if self.max_concurrent_downloads == 0 {
            return Err("max_concurrent_downloads must be at least 1".to_string());
        }
        if self.page_timeout_secs == 0 {
            return Err("page_timeout_secs must be at least 1".to_string());
        }
        if self.download_timeout_secs == 0 {
            return Err("download_timeout_secs must be at least 1".to_string());
        }
        if self.max_page_bytes == 0 {
            return Err("max_page_bytes must be at least 1".to_string());
        }
        if !(0..=9).contains(&self.compression_level) {
            return Err("compression_level must be between 0 and 9".to_string());
        }
        if self.stream_buffer_chunks == 0 {
            return Err("stream_buffer_chunks must be at least 1".to_string());
        }
        if self.chunk_size == 0 {
            return Err("chunk_size must be at least 1".to_string());
        }
        Ok(())
    }

    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            marker: "product".to_string(),
            default_extension: ".png".to_string(),
            work_root: env::temp_dir().join("product-image-scraper"),
            max_concurrent_downloads: 8,
            page_timeout_secs: 15,
            download_timeout_secs: 30,
            max_page_bytes: 10 * 1024 * 1024,
            compression_level: 9,
            stream_buffer_chunks: 16,
            chunk_size: 64 * 1024,
            user_agent: concat!("product-image-scraper/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}
