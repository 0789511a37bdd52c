// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// Product image scraper CLI
#[derive(Parser, Debug)]
#[command(name = "product-scraper-cli")]
#[command(version)]
#[command(about = "Download a listing page's product images as a zip archive", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scrape one page and write the archive to a file
    Scrape(commands::ScrapeArgs),

    /// Run the HTTP server
    Serve(commands::ServeArgs),
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Scrape(args) => commands::scrape(args).await,
        Commands::Serve(args) => commands::serve(args).await,
    }
}
