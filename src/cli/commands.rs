// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use clap::Args;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::api::{start_server, ServerConfig};
use crate::scrape::{ScrapeConfig, ScrapePipeline, ARCHIVE_FILE_NAME};

/// Arguments for the scrape command
#[derive(Args, Debug)]
pub struct ScrapeArgs {
    /// Listing page URL
    #[arg(long)]
    pub url: String,

    /// Archive destination
    #[arg(long, short, default_value = ARCHIVE_FILE_NAME)]
    pub output: PathBuf,

    /// Substring an image source must contain
    #[arg(long, env = "SCRAPE_IMAGE_MARKER")]
    pub marker: Option<String>,

    /// Maximum concurrent downloads
    #[arg(long, env = "SCRAPE_MAX_CONCURRENT_DOWNLOADS")]
    pub concurrency: Option<usize>,
}

/// Arguments for the serve command
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to bind, e.g. 0.0.0.0:3007
    #[arg(long, env = "LISTEN_ADDR")]
    pub listen: Option<String>,
}

pub async fn scrape(args: ScrapeArgs) -> Result<()> {
    let mut config = ScrapeConfig::from_env();
    if let Some(marker) = args.marker {
        config.marker = marker;
    }
    if let Some(concurrency) = args.concurrency {
        config.max_concurrent_downloads = concurrency;
    }
    let pipeline = ScrapePipeline::with_reqwest(config)?;

    // Removed again below if the pipeline fails before producing bytes
    let file = tokio::fs::File::create(&args.output)
        .await
        .with_context(|| format!("failed to create {}", args.output.display()))?;

    match pipeline.run_to_sink(&args.url, file).await {
        Ok(summary) => {
            info!(
                "Wrote {} images to {}",
                summary.entries,
                args.output.display()
            );
            println!("{} images -> {}", summary.entries, args.output.display());
            Ok(())
        }
        Err(e) => {
            if let Err(remove_err) = remove_partial_output(&args.output).await {
                warn!(
                    "Failed to remove partial archive {}: {}",
                    args.output.display(),
                    remove_err
                );
            }
            Err(anyhow::Error::new(e).context(format!("scrape of {} failed", args.url)))
        }
    }
}

/// Remove a partly written archive; a missing file is fine
async fn remove_partial_output(path: &Path) -> io::Result<()> {
    match tokio::fs::remove_file(path).await {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

pub async fn serve(args: ServeArgs) -> Result<()> {
    let mut server_config = ServerConfig::from_env();
    if let Some(listen) = args.listen {
        server_config.listen_addr = listen;
    }
    let pipeline = ScrapePipeline::with_reqwest(ScrapeConfig::from_env())?;

    start_server(server_config, pipeline, async {
        let _ = tokio::signal::ctrl_c().await;
        info!("Shutdown signal received");
    })
    .await
}
