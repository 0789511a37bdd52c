// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Product image scraping
//!
//! Fetches a listing page, collects product image URLs, downloads them into
//! a per-request directory and streams them back as one zip archive.
//!
//! ## Architecture
//!
//! ```text
//! URL → PageFetcher → HTML → extract_image_urls → [ImageReference]
//!                                                     ↓
//!        ArchiveStream ← ArchiveStreamer ← WorkingDirectory ← Downloader
//! ```
//!
//! The `WorkingDirectory` is removed on every exit path: success, any stage
//! failure, or the consumer dropping the archive stream.
//!
//! ## Usage
//!
//! ```ignore
//! let pipeline = ScrapePipeline::with_reqwest(ScrapeConfig::from_env())?;
//! let prepared = pipeline.prepare("https://shop.example/shoes").await?;
//! let body = prepared.into_stream();
//! ```

pub mod archive;
pub mod config;
pub mod downloader;
pub mod extractor;
pub mod fetcher;
pub mod pipeline;
pub mod transport;
pub mod types;
pub mod workdir;

pub use archive::{ArchiveStreamer, ArchiveSummary, ARCHIVE_CONTENT_TYPE, ARCHIVE_FILE_NAME};
pub use config::ScrapeConfig;
pub use downloader::{derive_extension, Downloader};
pub use extractor::extract_image_urls;
pub use fetcher::PageFetcher;
pub use pipeline::{ArchiveStream, PipelineStage, PipelineState, PreparedArchive, ScrapePipeline};
pub use transport::{BodyStream, HttpTransport, ReqwestTransport, TransportError, TransportResponse};
pub use types::{DownloadJob, FetchedPage, ImageReference, ScrapeError, ScrapeRequest};
pub use workdir::{CleanupError, WorkingDirectory};
