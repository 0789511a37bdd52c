// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod cli;
pub mod scrape;

pub use scrape::{
    ArchiveStream, ArchiveSummary, HttpTransport, ImageReference, PipelineStage, PipelineState,
    PreparedArchive, ScrapeConfig, ScrapeError, ScrapePipeline, ScrapeRequest, WorkingDirectory,
};
