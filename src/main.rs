// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use product_image_scraper::{
    api::{start_server, ServerConfig},
    scrape::{ScrapeConfig, ScrapePipeline},
};
use std::env;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    let scrape_config = ScrapeConfig::from_env();
    tracing::info!(
        "Scrape config: marker={:?}, work_root={}, max_concurrent_downloads={}, page_timeout={}s, download_timeout={}s",
        scrape_config.marker,
        scrape_config.work_root.display(),
        scrape_config.max_concurrent_downloads,
        scrape_config.page_timeout_secs,
        scrape_config.download_timeout_secs
    );

    let pipeline = ScrapePipeline::with_reqwest(scrape_config)?;
    let server_config = ServerConfig::from_env();

    start_server(server_config, pipeline, async {
        let _ = signal::ctrl_c().await;
        tracing::info!("Shutting down");
    })
    .await
}
