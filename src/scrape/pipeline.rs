// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Scrape pipeline orchestration
//!
//! ```text
//! Validating → Fetching → Extracting → Downloading → Archiving → Completed
//!      └───────────┴───────────┴────────────┴────────────┴──→ Failed
//!                                          Completed | Failed → Cleaned
//! ```
//!
//! Each transition is a single `step()` on an explicit `PipelineState`, so
//! any stage can be driven in isolation. The working directory is allocated
//! before the first step and removed on every exit path.

use bytes::Bytes;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::AsyncWrite;
use tokio_util::io::ReaderStream;
use tracing::{debug, error, info, warn};

use super::archive::{ArchiveStreamer, ArchiveSummary};
use super::config::ScrapeConfig;
use super::downloader::Downloader;
use super::extractor::extract_image_urls;
use super::fetcher::PageFetcher;
use super::transport::{HttpTransport, ReqwestTransport};
use super::types::{FetchedPage, ImageReference, ScrapeError, ScrapeRequest};
use super::workdir::WorkingDirectory;

/// Pipeline stage tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    Validating,
    Fetching,
    Extracting,
    Downloading,
    Archiving,
    Completed,
    Failed,
    Cleaned,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Validating => "validating",
            PipelineStage::Fetching => "fetching",
            PipelineStage::Extracting => "extracting",
            PipelineStage::Downloading => "downloading",
            PipelineStage::Archiving => "archiving",
            PipelineStage::Completed => "completed",
            PipelineStage::Failed => "failed",
            PipelineStage::Cleaned => "cleaned",
        };
        f.write_str(name)
    }
}

/// Pipeline state with the data each stage consumes
#[derive(Debug, Clone)]
pub enum PipelineState {
    Validating { raw_url: String },
    Fetching { request: ScrapeRequest },
    Extracting { page: FetchedPage },
    Downloading { images: Vec<ImageReference> },
    Archiving { files: Vec<PathBuf> },
    Completed { summary: ArchiveSummary },
    Failed {
        /// Stage that produced the error
        stage: PipelineStage,
        error: ScrapeError,
    },
}

impl PipelineState {
    pub fn stage(&self) -> PipelineStage {
        match self {
            PipelineState::Validating { .. } => PipelineStage::Validating,
            PipelineState::Fetching { .. } => PipelineStage::Fetching,
            PipelineState::Extracting { .. } => PipelineStage::Extracting,
            PipelineState::Downloading { .. } => PipelineStage::Downloading,
            PipelineState::Archiving { .. } => PipelineStage::Archiving,
            PipelineState::Completed { .. } => PipelineStage::Completed,
            PipelineState::Failed { .. } => PipelineStage::Failed,
        }
    }

    fn failed(stage: PipelineStage, error: ScrapeError) -> Self {
        PipelineState::Failed { stage, error }
    }
}

/// Scrape pipeline: fetch, extract, download, archive
pub struct ScrapePipeline {
    config: ScrapeConfig,
    fetcher: PageFetcher,
    downloader: Downloader,
    streamer: ArchiveStreamer,
}

impl ScrapePipeline {
    /// Create a pipeline over any transport
    pub fn new(transport: Arc<dyn HttpTransport>, config: ScrapeConfig) -> Self {
        Self {
            fetcher: PageFetcher::new(transport.clone(), &config),
            downloader: Downloader::new(transport, &config),
            streamer: ArchiveStreamer::new(&config),
            config,
        }
    }

    /// Create a pipeline backed by `reqwest`
    pub fn with_reqwest(config: ScrapeConfig) -> anyhow::Result<Self> {
        config.validate().map_err(anyhow::Error::msg)?;
        let transport = ReqwestTransport::new(&config)?;
        Ok(Self::new(Arc::new(transport), config))
    }

    pub fn config(&self) -> &ScrapeConfig {
        &self.config
    }

    /// Advance one transition
    ///
    /// `Archiving`, `Completed` and `Failed` are returned unchanged; archiving
    /// is driven by `PreparedArchive`.
    pub async fn step(&self, state: PipelineState, workdir: &WorkingDirectory) -> PipelineState {
        let from = state.stage();
        let next = match state {
            PipelineState::Validating { raw_url } => match ScrapeRequest::parse(&raw_url) {
                Ok(request) => PipelineState::Fetching { request },
                Err(e) => PipelineState::failed(from, e),
            },
            PipelineState::Fetching { request } => match self.fetcher.fetch(&request).await {
                Ok(page) => PipelineState::Extracting { page },
                Err(e) => PipelineState::failed(from, e),
            },
            PipelineState::Extracting { page } => {
                let images = extract_image_urls(&page.body, &page.origin, &self.config.marker);
                if images.is_empty() {
                    PipelineState::failed(from, ScrapeError::ExtractionEmpty)
                } else {
                    info!("Found {} product images on {}", images.len(), page.url);
                    PipelineState::Downloading { images }
                }
            }
            PipelineState::Downloading { images } => {
                match self.downloader.download_all(&images, workdir.path()).await {
                    Ok(files) => PipelineState::Archiving { files },
                    Err(e) => PipelineState::failed(from, e),
                }
            }
            terminal => terminal,
        };

        if next.stage() != from {
            debug!("Pipeline {} -> {}", from, next.stage());
        }
        next
    }

    /// Run every stage up to archiving
    ///
    /// On failure the working directory is already removed when this returns.
    pub async fn prepare(&self, raw_url: &str) -> Result<PreparedArchive, ScrapeError> {
        let workdir = WorkingDirectory::allocate(&self.config.work_root);
        let mut state = PipelineState::Validating {
            raw_url: raw_url.to_string(),
        };

        loop {
            state = self.step(state, &workdir).await;
            match state {
                PipelineState::Archiving { files } => {
                    return Ok(PreparedArchive {
                        workdir,
                        image_count: files.len(),
                        streamer: self.streamer.clone(),
                        buffer_bytes: self.config.chunk_size * self.config.stream_buffer_chunks,
                        chunk_size: self.config.chunk_size,
                    });
                }
                PipelineState::Failed { stage, error } => {
                    warn!("Scrape of {} failed while {}: {}", raw_url, stage, error);
                    workdir.cleanup_async().await;
                    debug!("Pipeline {} -> {}", PipelineStage::Failed, PipelineStage::Cleaned);
                    return Err(error);
                }
                _ => {}
            }
        }
    }

    /// Run the whole pipeline, writing the archive into `sink`
    pub async fn run_to_sink<W>(&self, raw_url: &str, sink: W) -> Result<ArchiveSummary, ScrapeError>
    where
        W: AsyncWrite + Unpin,
    {
        self.prepare(raw_url).await?.write_to(sink).await
    }
}

/// Downloaded images waiting to be archived
///
/// Owns the working directory; dropping this without archiving still
/// removes it.
#[derive(Debug)]
pub struct PreparedArchive {
    workdir: WorkingDirectory,
    image_count: usize,
    streamer: ArchiveStreamer,
    buffer_bytes: usize,
    chunk_size: usize,
}

impl PreparedArchive {
    pub fn image_count(&self) -> usize {
        self.image_count
    }

    pub fn directory(&self) -> &std::path::Path {
        self.workdir.path()
    }

    /// Archive into `sink`, then clean up regardless of outcome
    pub async fn write_to<W>(self, sink: W) -> Result<ArchiveSummary, ScrapeError>
    where
        W: AsyncWrite + Unpin,
    {
        let result = self.streamer.write_directory(self.workdir.path(), sink).await;
        let outcome = match &result {
            Ok(_) => PipelineStage::Completed,
            Err(error) => {
                error!("Archive streaming failed: {}", error);
                PipelineStage::Failed
            }
        };
        debug!("Pipeline {} -> {}", PipelineStage::Archiving, outcome);

        self.workdir.cleanup_async().await;
        debug!("Pipeline {} -> {}", outcome, PipelineStage::Cleaned);
        result
    }

    /// Archive on a background task, exposing the bytes as a stream
    ///
    /// The stream applies backpressure through a bounded pipe. If the
    /// consumer goes away, the archive task fails on its next write and
    /// cleans up. A failure after bytes were produced ends the stream with
    /// an error so the transport can abort the response.
    pub fn into_stream(self) -> ArchiveStream {
        let (writer, reader) = tokio::io::duplex(self.buffer_bytes.max(1));
        let chunk_size = self.chunk_size.max(1);
        let task = tokio::spawn(self.write_to(writer));

        let tail = stream::once(async move {
            match task.await {
                Ok(Ok(_)) => None,
                Ok(Err(e)) => Some(Err(io::Error::new(io::ErrorKind::Other, e))),
                Err(e) => Some(Err(io::Error::new(io::ErrorKind::Other, e.to_string()))),
            }
        })
        .filter_map(futures::future::ready);

        ArchiveStream {
            inner: ReaderStream::with_capacity(reader, chunk_size)
                .chain(tail)
                .boxed(),
        }
    }
}

/// Archive bytes produced by a background task
pub struct ArchiveStream {
    inner: BoxStream<'static, io::Result<Bytes>>,
}

impl std::fmt::Debug for ArchiveStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveStream").finish_non_exhaustive()
    }
}

impl ArchiveStream {
    /// Wait for the first chunk before anything is committed to a client
    ///
    /// A failure before any byte is produced comes back as the pipeline's
    /// error. Otherwise the chunk is put back at the front of the stream.
    pub async fn primed(mut self) -> Result<Self, ScrapeError> {
        match self.inner.next().await {
            Some(Ok(first)) => {
                let rest = std::mem::replace(&mut self.inner, stream::empty().boxed());
                self.inner = stream::once(futures::future::ready(Ok(first)))
                    .chain(rest)
                    .boxed();
                Ok(self)
            }
            Some(Err(e)) => Err(scrape_error_from_io(e)),
            None => Ok(self),
        }
    }
}

/// Recover the `ScrapeError` an archive task failed with
fn scrape_error_from_io(err: io::Error) -> ScrapeError {
    match err
        .get_ref()
        .and_then(|inner| inner.downcast_ref::<ScrapeError>())
    {
        Some(e) => e.clone(),
        None => ScrapeError::archive(err),
    }
}

impl Stream for ArchiveStream {
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}
