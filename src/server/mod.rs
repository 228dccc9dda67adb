//! HTTP surface.
//!
//! Thin axum layer over the engine: handlers translate paths and query
//! strings into engine calls and engine outcomes back into HTTP. No
//! aggregation, caching, or scoring logic lives here.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::Method,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::Config;
use crate::search::{Resolver, SearchEngine};

pub mod routes_subtitles;

/// Shared application context.
#[derive(Clone)]
pub struct AppContext {
    pub engine: Arc<SearchEngine>,
    pub resolver: Arc<Resolver>,
    pub config: Arc<Config>,
}

/// Create the axum router with all routes.
pub fn create_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET]);

    Router::new()
        .route("/health", get(health))
        .route("/manifest.json", get(manifest))
        .merge(routes_subtitles::routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

/// Bind and serve until ctrl-c.
pub async fn start_server(ctx: AppContext) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", ctx.config.server.host, ctx.config.server.port)
        .parse()
        .context("invalid server address")?;

    let app = create_router(ctx);

    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown signal received");
}

async fn health(State(ctx): State<AppContext>) -> impl IntoResponse {
    let stats = ctx.engine.stats();
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "cache": {
            "result_hits": stats.result_cache_hits,
            "result_misses": stats.result_cache_misses,
            "result_sets": stats.cached_result_sets,
            "availability_entries": stats.availability_entries,
            "resolved_links": ctx.resolver.cached_links(),
        }
    }))
}

/// Addon manifest consumed by media-center clients.
async fn manifest() -> impl IntoResponse {
    Json(serde_json::json!({
        "id": "net.submerge.subtitles",
        "version": env!("CARGO_PKG_VERSION"),
        "name": "Submerge",
        "description": "Aggregated subtitle search across multiple providers",
        "resources": ["subtitles"],
        "types": ["movie", "series"],
        "idPrefixes": ["tt"]
    }))
}
