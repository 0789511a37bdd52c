// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Streaming zip output
//!
//! Entries are written with data descriptors, so nothing is ever seeked or
//! buffered beyond one chunk. When the sink is a bounded pipe, compression
//! waits for the consumer instead of growing memory.

use async_zip::base::write::ZipFileWriter;
use async_zip::{Compression, DeflateOption, ZipEntryBuilder};
use std::io;
use std::path::Path;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::compat::TokioAsyncReadCompatExt;
use tracing::{debug, info};

use super::config::ScrapeConfig;
use super::types::ScrapeError;

/// Media type of the produced archive
pub const ARCHIVE_CONTENT_TYPE: &str = "application/zip";
/// Suggested download file name
pub const ARCHIVE_FILE_NAME: &str = "product-images.zip";

/// Result of a finished archive
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveSummary {
    /// Number of entries written
    pub entries: usize,
    /// Uncompressed bytes read from the directory
    pub source_bytes: u64,
}

/// Write-once sink; writes after `finalize` fail
pub struct ArchiveSink<W> {
    inner: W,
    finalized: bool,
    written: u64,
}

impl<W: AsyncWrite + Unpin> ArchiveSink<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            finalized: false,
            written: 0,
        }
    }

    /// Flush and shut down the inner writer
    pub async fn finalize(&mut self) -> io::Result<()> {
        if self.finalized {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                "archive sink already finalized",
            ));
        }
        self.shutdown().await
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Bytes accepted by the inner writer
    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: AsyncWrite + Unpin> AsyncWrite for ArchiveSink<W> {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        if self.finalized {
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "write after archive finalized",
            )));
        }
        let poll = Pin::new(&mut self.inner).poll_write(cx, buf);
        if let Poll::Ready(Ok(n)) = poll {
            self.written += n as u64;
        }
        poll
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let poll = Pin::new(&mut self.inner).poll_shutdown(cx);
        if let Poll::Ready(Ok(())) = poll {
            self.finalized = true;
        }
        poll
    }
}

/// Compresses a flat directory into a zip stream
#[derive(Debug, Clone)]
pub struct ArchiveStreamer {
    compression_level: i32,
}

impl ArchiveStreamer {
    pub fn new(config: &ScrapeConfig) -> Self {
        Self {
            compression_level: config.compression_level,
        }
    }

    /// Archive the immediate files of `dir` into `sink`
    ///
    /// Entries are named by file name only and appear in directory-listing
    /// order, which is not guaranteed to match sequence order. The sink is
    /// finalized before returning.
    pub async fn write_directory<W>(
        &self,
        dir: &Path,
        sink: W,
    ) -> Result<ArchiveSummary, ScrapeError>
    where
        W: AsyncWrite + Unpin,
    {
        let mut writer = ZipFileWriter::with_tokio(ArchiveSink::new(sink));
        let mut summary = ArchiveSummary::default();

        let mut entries = tokio::fs::read_dir(dir).await.map_err(ScrapeError::archive)?;
        while let Some(entry) = entries.next_entry().await.map_err(ScrapeError::archive)? {
            let file_type = entry.file_type().await.map_err(ScrapeError::archive)?;
            if !file_type.is_file() {
                continue;
            }

            let name = entry.file_name().to_string_lossy().to_string();
            let source = tokio::fs::File::open(entry.path())
                .await
                .map_err(|e| ScrapeError::archive(format!("failed to open {}: {}", name, e)))?;

            let builder = ZipEntryBuilder::new(name.clone().into(), Compression::Deflate)
                .deflate_option(DeflateOption::Other(self.compression_level));
            let mut entry_writer = writer
                .write_entry_stream(builder)
                .await
                .map_err(ScrapeError::archive)?;
            let copied = futures::io::copy(&mut source.compat(), &mut entry_writer)
                .await
                .map_err(|e| ScrapeError::archive(format!("failed to add {}: {}", name, e)))?;
            entry_writer.close().await.map_err(ScrapeError::archive)?;

            debug!("Added {} ({} bytes) to archive", name, copied);
            summary.entries += 1;
            summary.source_bytes += copied;
        }

        let mut sink = writer.close().await.map_err(ScrapeError::archive)?.into_inner();
        if !sink.is_finalized() {
            sink.finalize().await.map_err(ScrapeError::archive)?;
        }

        info!(
            "Archive finalized: {} entries, {} source bytes, {} archive bytes",
            summary.entries,
            summary.source_bytes,
            sink.bytes_written()
        );
        Ok(summary)
    }
}
