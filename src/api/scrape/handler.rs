// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Scrape API endpoint handler

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::Response;
use axum::Json;
use tracing::{debug, info, warn};

use super::request::ScrapeApiRequest;
use crate::api::errors::ApiError;
use crate::api::server::AppState;
use crate::scrape::{PreparedArchive, ARCHIVE_CONTENT_TYPE, ARCHIVE_FILE_NAME};

/// POST /api/scrape - Download a page's product images as a zip
///
/// # Request
/// - `url`: Listing page URL (required, http or https)
///
/// # Response
/// `application/zip` body streamed as it is compressed, with
/// `Content-Disposition: attachment; filename="product-images.zip"`.
///
/// # Errors
/// - 400 Bad Request: URL missing or invalid
/// - 404 Not Found: No product images on the page
/// - 500 Internal Server Error: Image download failed, or the archive
///   failed before its first byte
/// - 502 Bad Gateway: Listing page unreachable
///
/// Once streaming has started, failures abort the connection instead.
pub async fn scrape_handler(
    State(state): State<AppState>,
    Json(request): Json<ScrapeApiRequest>,
) -> Result<Response, ApiError> {
    let url = request.target_url().map_err(|e| {
        warn!("Scrape validation failed: {}", e);
        ApiError::InvalidRequest(e)
    })?;
    debug!("Scrape request: {}", url);

    let prepared = state.pipeline.prepare(url).await?;
    info!(
        "Streaming {} product images from {}",
        prepared.image_count(),
        url
    );
    archive_response(prepared).await
}

/// Build the zip response once the archive has produced its first bytes
///
/// Failures before that point still get a JSON error and status code.
pub async fn archive_response(prepared: PreparedArchive) -> Result<Response, ApiError> {
    let stream = prepared.into_stream().primed().await.map_err(|e| {
        warn!("Archive failed before streaming: {}", e);
        ApiError::from(e)
    })?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, ARCHIVE_CONTENT_TYPE)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", ARCHIVE_FILE_NAME),
        )
        .body(Body::from_stream(stream))
        .map_err(|e| ApiError::InternalError(e.to_string()))
}
