// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// HTTP boundary: status mapping, headers and streamed body

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::response::IntoResponse;
use axum::Router;
use futures::StreamExt;
use product_image_scraper::api::{archive_response, create_router, AppState};
use product_image_scraper::scrape::{ScrapeConfig, ScrapePipeline};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

use super::support::{config_in, leftover_dirs, unzip, FakeTransport, PAGE_URL};

fn app(transport: Arc<FakeTransport>, root: &Path) -> Router {
    create_router(AppState {
        pipeline: Arc::new(ScrapePipeline::new(transport, config_in(root))),
    })
}

fn scrape_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/scrape")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_missing_url_is_bad_request() {
    let root = TempDir::new().unwrap();
    let transport = FakeTransport::new().shared();

    for body in ["{}", r#"{"url": 12}"#] {
        let response = app(transport.clone(), root.path())
            .oneshot(scrape_request(body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "URL is required");
    }
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn test_invalid_scheme_is_bad_request() {
    let root = TempDir::new().unwrap();
    let transport = FakeTransport::new().shared();

    let response = app(transport.clone(), root.path())
        .oneshot(scrape_request(r#"{"url": "ftp://shop.example/list"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"], "Invalid URL");
    assert_eq!(body["error_type"], "invalid_url");
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn test_no_images_is_not_found() {
    let root = TempDir::new().unwrap();
    let transport = FakeTransport::new()
        .page(PAGE_URL, r#"<img src="/logo.png">"#)
        .shared();

    let response = app(transport, root.path())
        .oneshot(scrape_request(&format!(r#"{{"url": "{}"}}"#, PAGE_URL)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        json_body(response).await["error"],
        "No product images found on this page"
    );
}

#[tokio::test]
async fn test_unreachable_page_is_bad_gateway() {
    let root = TempDir::new().unwrap();
    let response = app(FakeTransport::new().shared(), root.path())
        .oneshot(scrape_request(&format!(r#"{{"url": "{}"}}"#, PAGE_URL)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(json_body(response).await["error_type"], "fetch_failed");
}

#[tokio::test]
async fn test_download_failure_is_server_error() {
    let root = TempDir::new().unwrap();
    let transport = FakeTransport::new()
        .page(PAGE_URL, r#"<img src="/img/product-1.jpg">"#)
        .status("https://shop.example/img/product-1.jpg", 500)
        .shared();

    let response = app(transport, root.path())
        .oneshot(scrape_request(&format!(r#"{{"url": "{}"}}"#, PAGE_URL)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(response).await["error_type"], "download_failed");
    assert_eq!(leftover_dirs(root.path()), 0);
}

#[tokio::test]
async fn test_success_streams_zip_with_headers() {
    let root = TempDir::new().unwrap();
    let transport = FakeTransport::new()
        .page(
            PAGE_URL,
            r#"<img src="/img/product-1.png"><img src="/img/product-2.jpg">"#,
        )
        .image("https://shop.example/img/product-1.png", b"png data")
        .image("https://shop.example/img/product-2.jpg", b"jpg data")
        .shared();

    let response = app(transport, root.path())
        .oneshot(scrape_request(&format!(r#"{{"url": "{}"}}"#, PAGE_URL)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/zip"
    );
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"product-images.zip\""
    );

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(
        unzip(&bytes),
        vec![
            ("1.png".to_string(), b"png data".to_vec()),
            ("2.jpg".to_string(), b"jpg data".to_vec()),
        ]
    );
    assert_eq!(leftover_dirs(root.path()), 0);
}

#[tokio::test]
async fn test_archive_failure_before_first_byte_is_server_error() {
    let root = TempDir::new().unwrap();
    let transport = FakeTransport::new()
        .page(PAGE_URL, r#"<img src="/img/product-1.png">"#)
        .image("https://shop.example/img/product-1.png", b"png data")
        .shared();
    let pipeline = ScrapePipeline::new(transport, config_in(root.path()));

    let prepared = pipeline.prepare(PAGE_URL).await.unwrap();
    std::fs::remove_dir_all(prepared.directory()).unwrap();

    let err = archive_response(prepared).await.unwrap_err();
    let response = err.into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert_eq!(body["error_type"], "archive_failed");
    assert!(body["error"].as_str().unwrap().starts_with("Zip failed"));
    assert_eq!(leftover_dirs(root.path()), 0);
}

#[tokio::test]
async fn test_failure_after_streaming_starts_aborts_body() {
    let root = TempDir::new().unwrap();
    let big = vec![3u8; 512 * 1024];
    let transport = FakeTransport::new()
        .page(
            PAGE_URL,
            r#"<img src="/img/product-1.png"><img src="/img/product-2.png">"#,
        )
        .image("https://shop.example/img/product-1.png", &big)
        .image("https://shop.example/img/product-2.png", &big)
        .shared();
    // Small pipe and no compression keep the archive task inside the first entry
    let config = ScrapeConfig {
        compression_level: 0,
        chunk_size: 1024,
        stream_buffer_chunks: 1,
        ..config_in(root.path())
    };
    let app = create_router(AppState {
        pipeline: Arc::new(ScrapePipeline::new(transport, config)),
    });

    let response = app
        .oneshot(scrape_request(&format!(r#"{{"url": "{}"}}"#, PAGE_URL)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let mut body = response.into_body().into_data_stream();
    assert!(body.next().await.unwrap().is_ok());

    // The second entry can no longer be opened
    let workdir = std::fs::read_dir(root.path())
        .unwrap()
        .next()
        .unwrap()
        .unwrap()
        .path();
    std::fs::remove_dir_all(&workdir).unwrap();

    let mut failed = false;
    while let Some(frame) = body.next().await {
        if frame.is_err() {
            failed = true;
            break;
        }
    }
    assert!(failed);
    assert_eq!(leftover_dirs(root.path()), 0);
}

#[tokio::test]
async fn test_health() {
    let root = TempDir::new().unwrap();
    let response = app(FakeTransport::new().shared(), root.path())
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "ok");
}
