// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Product image URL extraction
//!
//! Collects `<img src>` values containing the marker substring, in document
//! order. Sources starting with `/` are prefixed with the page origin;
//! everything else passes through untouched, including relative paths that
//! will later fail to download.

use scraper::{Html, Selector};
use tracing::debug;

use super::types::ImageReference;

/// Extract qualifying image references from raw HTML
///
/// # Arguments
/// * `html` - Raw page bytes (decoded lossily as UTF-8)
/// * `origin` - Page origin, e.g. `https://shop.example`
/// * `marker` - Case-sensitive substring a `src` must contain
///
/// # Returns
/// References in document order, duplicates kept. Empty when nothing matches.
pub fn extract_image_urls(html: &[u8], origin: &str, marker: &str) -> Vec<ImageReference> {
    let markup = String::from_utf8_lossy(html);
    let document = Html::parse_document(&markup);

    let selector = match Selector::parse("img") {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };

    let images: Vec<ImageReference> = document
        .select(&selector)
        .filter_map(|element| element.value().attr("src"))
        .filter(|src| src.contains(marker))
        .map(|src| ImageReference::new(resolve_source(src, origin)))
        .collect();

    debug!("Extracted {} image references", images.len());
    images
}

/// Prefix any value starting with `/` with the origin
///
/// Plain concatenation, so `//cdn/...` becomes `{origin}//cdn/...` too.
fn resolve_source(src: &str, origin: &str) -> String {
    if src.starts_with('/') {
        format!("{}{}", origin, src)
    } else {
        src.to_string()
    }
}
