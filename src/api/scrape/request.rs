// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Scrape API request types

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request body for POST /api/scrape
///
/// `url` is kept loosely typed so a missing or non-string value gets the
/// same "URL is required" answer instead of a deserialization rejection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScrapeApiRequest {
    #[serde(default)]
    pub url: Option<Value>,
}

impl ScrapeApiRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: Some(Value::String(url.into())),
        }
    }

    /// Validate the request and return the raw target URL
    pub fn target_url(&self) -> Result<&str, String> {
        match &self.url {
            Some(Value::String(url)) if !url.trim().is_empty() => Ok(url.as_str()),
            _ => Err("URL is required".to_string()),
        }
    }
}
