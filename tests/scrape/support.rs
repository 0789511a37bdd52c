// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! In-memory transport for pipeline tests

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use product_image_scraper::scrape::{HttpTransport, ScrapeConfig, TransportError, TransportResponse};
use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const PAGE_URL: &str = "https://shop.example/category/shoes";

#[derive(Clone)]
struct Route {
    status: u16,
    body: Vec<u8>,
    delay: Duration,
}

/// Serves canned responses and records every requested URL
#[derive(Default)]
pub struct FakeTransport {
    routes: HashMap<String, Route>,
    requests: Mutex<Vec<String>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(self, url: &str, html: &str) -> Self {
        self.route(url, 200, html.as_bytes(), 0)
    }

    pub fn image(self, url: &str, body: &[u8]) -> Self {
        self.route(url, 200, body, 0)
    }

    pub fn slow_image(self, url: &str, body: &[u8], delay_ms: u64) -> Self {
        self.route(url, 200, body, delay_ms)
    }

    pub fn status(self, url: &str, status: u16) -> Self {
        self.route(url, status, b"", 0)
    }

    fn route(mut self, url: &str, status: u16, body: &[u8], delay_ms: u64) -> Self {
        self.routes.insert(
            url.to_string(),
            Route {
                status,
                body: body.to_vec(),
                delay: Duration::from_millis(delay_ms),
            },
        );
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl HttpTransport for FakeTransport {
    async fn get(&self, url: &str) -> Result<TransportResponse, TransportError> {
        self.requests.lock().unwrap().push(url.to_string());

        let route = self
            .routes
            .get(url)
            .cloned()
            .ok_or_else(|| TransportError::Request(format!("connection refused: {}", url)))?;
        if !route.delay.is_zero() {
            tokio::time::sleep(route.delay).await;
        }

        // Split into two chunks so writers see more than one piece
        let mid = route.body.len() / 2;
        let chunks = vec![
            Ok(Bytes::copy_from_slice(&route.body[..mid])),
            Ok(Bytes::copy_from_slice(&route.body[mid..])),
        ];
        Ok(TransportResponse {
            status: route.status,
            body: stream::iter(chunks).boxed(),
        })
    }
}

pub fn config_in(work_root: &Path) -> ScrapeConfig {
    ScrapeConfig {
        work_root: work_root.to_path_buf(),
        ..ScrapeConfig::default()
    }
}

/// Number of entries left under the work root
pub fn leftover_dirs(work_root: &Path) -> usize {
    match std::fs::read_dir(work_root) {
        Ok(entries) => entries.count(),
        Err(_) => 0,
    }
}

/// Unpack an archive into (name, bytes) pairs sorted by name
pub fn unzip(bytes: &[u8]) -> Vec<(String, Vec<u8>)> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
    let mut entries = Vec::new();
    for i in 0..archive.len() {
        let mut file = archive.by_index(i).unwrap();
        let mut contents = Vec::new();
        file.read_to_end(&mut contents).unwrap();
        entries.push((file.name().to_string(), contents));
    }
    entries.sort();
    entries
}
