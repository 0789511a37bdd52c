// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Core types for product image scraping

use bytes::Bytes;
use std::path::PathBuf;
use thiserror::Error;
use url::Url;

/// A validated request to harvest images from one listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeRequest {
    target_url: Url,
}

impl ScrapeRequest {
    /// Parse and validate caller input
    ///
    /// Only absolute `http` and `https` URLs are accepted. No I/O happens here.
    pub fn parse(raw: &str) -> Result<Self, ScrapeError> {
        let target_url = Url::parse(raw.trim()).map_err(|e| ScrapeError::Validation {
            reason: e.to_string(),
        })?;

        if !["http", "https"].contains(&target_url.scheme()) {
            return Err(ScrapeError::Validation {
                reason: format!("unsupported scheme '{}'", target_url.scheme()),
            });
        }

        Ok(Self { target_url })
    }

    pub fn url(&self) -> &Url {
        &self.target_url
    }

    /// Scheme, host and non-default port, e.g. `https://shop.example`
    pub fn origin(&self) -> String {
        self.target_url.origin().ascii_serialization()
    }
}

/// Listing page body plus the origin used to resolve root-relative sources
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub url: String,
    pub origin: String,
    pub body: Bytes,
}

/// One extracted image URL, in document order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    pub absolute_url: String,
}

impl ImageReference {
    pub fn new(absolute_url: impl Into<String>) -> Self {
        Self {
            absolute_url: absolute_url.into(),
        }
    }
}

/// A single planned download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadJob {
    pub image: ImageReference,
    pub destination: PathBuf,
    /// 1-based position in the extracted sequence; names the output file
    pub sequence_index: usize,
}

/// Errors that can end a scrape request
#[derive(Debug, Clone, Error)]
pub enum ScrapeError {
    /// Input URL failed to parse or used a scheme other than http/https
    #[error("Invalid URL: {reason}")]
    Validation {
        /// Why the URL was rejected
        reason: String,
    },

    /// Listing page could not be fetched
    #[error("Failed to fetch {url}: {reason}")]
    Fetch {
        /// Page URL
        url: String,
        /// Transport or status failure
        reason: String,
    },

    /// No image on the page matched the marker
    #[error("No product images found on this page")]
    ExtractionEmpty,

    /// At least one image download failed
    #[error("Failed to download image {index} from {url}: {reason} ({failed} of {total} downloads failed)")]
    Download {
        /// Sequence index of the first failed job
        index: usize,
        /// URL of the first failed job
        url: String,
        /// Failure of the first failed job
        reason: String,
        /// Number of failed jobs
        failed: usize,
        /// Number of jobs attempted
        total: usize,
    },

    /// Archive could not be produced or delivered
    #[error("Zip failed: {reason}")]
    Archive {
        /// Read, compression or sink failure
        reason: String,
    },
}

impl ScrapeError {
    /// Machine-readable error kind
    pub fn kind(&self) -> &'static str {
        match self {
            ScrapeError::Validation { .. } => "invalid_url",
            ScrapeError::Fetch { .. } => "fetch_failed",
            ScrapeError::ExtractionEmpty => "no_images",
            ScrapeError::Download { .. } => "download_failed",
            ScrapeError::Archive { .. } => "archive_failed",
        }
    }

    /// Suggested HTTP status for the web layer
    pub fn status_code(&self) -> u16 {
        match self {
            ScrapeError::Validation { .. } => 400,
            ScrapeError::Fetch { .. } => 502,
            ScrapeError::ExtractionEmpty => 404,
            ScrapeError::Download { .. } | ScrapeError::Archive { .. } => 500,
        }
    }

    pub(crate) fn archive(err: impl std::fmt::Display) -> Self {
        ScrapeError::Archive {
            reason: err.to_string(),
        }
    }
}
