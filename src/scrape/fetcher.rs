// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Listing page fetching
//!
//! One GET per request, bounded by a timeout and a body size cap. No retries.

use bytes::BytesMut;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::config::ScrapeConfig;
use super::transport::HttpTransport;
use super::types::{FetchedPage, ScrapeError, ScrapeRequest};

/// Fetches the listing page for a scrape request
pub struct PageFetcher {
    transport: Arc<dyn HttpTransport>,
    timeout: Duration,
    max_page_bytes: usize,
}

impl PageFetcher {
    pub fn new(transport: Arc<dyn HttpTransport>, config: &ScrapeConfig) -> Self {
        Self {
            transport,
            timeout: config.page_timeout(),
            max_page_bytes: config.max_page_bytes,
        }
    }

    /// Fetch the page body and its origin
    pub async fn fetch(&self, request: &ScrapeRequest) -> Result<FetchedPage, ScrapeError> {
        let url = request.url().as_str();
        debug!("Fetching listing page: {}", url);

        match tokio::time::timeout(self.timeout, self.fetch_body(url)).await {
            Ok(Ok(body)) => {
                info!("Fetched {} bytes from: {}", body.len(), url);
                Ok(FetchedPage {
                    url: url.to_string(),
                    origin: request.origin(),
                    body: body.freeze(),
                })
            }
            Ok(Err(reason)) => Err(ScrapeError::Fetch {
                url: url.to_string(),
                reason,
            }),
            Err(_) => Err(ScrapeError::Fetch {
                url: url.to_string(),
                reason: format!("timed out after {}s", self.timeout.as_secs()),
            }),
        }
    }

    async fn fetch_body(&self, url: &str) -> Result<BytesMut, String> {
        let response = self.transport.get(url).await.map_err(|e| e.to_string())?;
        if !response.is_success() {
            return Err(format!("HTTP {}", response.status));
        }

        let mut body = BytesMut::new();
        let mut stream = response.body;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| e.to_string())?;
            if body.len() + chunk.len() > self.max_page_bytes {
                return Err(format!(
                    "page exceeds {} byte limit",
                    self.max_page_bytes
                ));
            }
            body.extend_from_slice(&chunk);
        }

        Ok(body)
    }
}
