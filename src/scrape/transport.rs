// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! HTTP transport abstraction
//!
//! The pipeline only needs "GET a URL, give me a status and a body stream".
//! Keeping that behind a trait lets tests count, delay and fail requests
//! without a network.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

use super::config::ScrapeConfig;

/// Response body as a stream of chunks
pub type BodyStream = BoxStream<'static, Result<Bytes, TransportError>>;

/// Response returned by a transport
pub struct TransportResponse {
    pub status: u16,
    pub body: BodyStream,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl std::fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// Transport-level failures
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Request timed out
    #[error("Timeout requesting {0}")]
    Timeout(String),

    /// Connection or protocol failure
    #[error("HTTP error: {0}")]
    Request(String),

    /// Failure while reading the response body
    #[error("Body read error: {0}")]
    Body(String),
}

/// Trait for issuing GET requests
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send a GET request; the body is not read yet
    async fn get(&self, url: &str) -> Result<TransportResponse, TransportError>;
}

/// `reqwest`-backed transport
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Build a client from the scrape configuration
    ///
    /// The client-level timeout is the larger of the page and download
    /// timeouts; the pipeline applies the tighter per-stage bound itself.
    pub fn new(config: &ScrapeConfig) -> Result<Self, TransportError> {
        let timeout = config.page_timeout().max(config.download_timeout());
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(config.user_agent.clone())
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| TransportError::Request(e.to_string()))?;

        Ok(Self { client })
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<TransportResponse, TransportError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout(url.to_string())
            } else {
                TransportError::Request(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| TransportError::Body(e.to_string())))
            .boxed();

        Ok(TransportResponse { status, body })
    }
}
