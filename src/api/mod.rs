// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod errors;
pub mod scrape;
pub mod server;

pub use errors::{ApiError, ErrorResponse};
pub use scrape::{archive_response, scrape_handler, ScrapeApiRequest};
pub use server::{create_router, start_server, AppState, HealthResponse, ServerConfig};
