// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Product image scrape endpoint
//!
//! Provides the `/api/scrape` HTTP endpoint.

pub mod handler;
pub mod request;

pub use handler::{archive_response, scrape_handler};
pub use request::ScrapeApiRequest;
