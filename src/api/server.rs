// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    extract::State,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::scrape::scrape_handler;
use crate::scrape::ScrapePipeline;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: String,
}

impl ServerConfig {
    /// `LISTEN_ADDR` wins over `PORT`; defaults to 0.0.0.0:3007
    pub fn from_env() -> Self {
        let listen_addr = env::var("LISTEN_ADDR")
            .ok()
            .filter(|v| !v.is_empty())
            .or_else(|| {
                env::var("PORT")
                    .ok()
                    .and_then(|p| p.parse::<u16>().ok())
                    .map(|p| format!("0.0.0.0:{}", p))
            })
            .unwrap_or_else(|| Self::default().listen_addr);
        Self { listen_addr }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:3007".to_string(),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ScrapePipeline>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/scrape", post(scrape_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve until `shutdown` resolves
pub async fn start_server<F>(
    config: ServerConfig,
    pipeline: ScrapePipeline,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let state = AppState {
        pipeline: Arc::new(pipeline),
    };
    let app = create_router(state);

    let addr = config.listen_addr.parse::<SocketAddr>()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Scrape server listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}

async fn health_handler(State(_state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
