//! Point query server.
//!
//! Presents an HTTP interface over geo-distance and bounding-box searches
//! against the points index: nearest-neighbor lookups under `/near` and
//! bounds-expression queries under `/all`.

use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use clap::Parser;
use serde::Serialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use tamarack::bounds::{parse_coordinate, BoundsQuery};
use tamarack::elasticsearch::{EsClient, EsConfig};

mod error;
mod search;

use error::ApiError;
use search::execute_bounds;

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

/// Maximum number of points returned by a single query.
const RESULT_CAP: usize = 100;

#[derive(Parser, Debug)]
#[command(name = "serve")]
#[command(about = "Point query server")]
struct Args {
    /// Listen address
    #[arg(short, long, default_value = "0.0.0.0:3000")]
    listen: String,

    /// Elasticsearch base URL
    #[arg(long, default_value = "http://localhost:9200")]
    es_url: String,

    /// Index to query
    #[arg(long, default_value = "points")]
    index: String,

    /// Directory of built static assets served under /dist
    #[arg(long, default_value = "dist")]
    dist_dir: String,
}

/// State handed to every request handler.
struct AppState {
    es_client: EsClient,
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::DEBUG)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    info!("Tamarack point server");
    info!("Elasticsearch endpoint: {}", args.es_url);

    let es_config = EsConfig {
        url: args.es_url.clone(),
        index: args.index.clone(),
    };
    let es_client = EsClient::connect(&es_config)?;

    // Queries report connectivity failures per request, so an unreachable
    // cluster at startup is not fatal.
    match es_client.health_check().await {
        Ok(true) => {
            let doc_count = es_client.doc_count().await.unwrap_or(0);
            info!(
                "Connected to index '{}' with {} documents",
                args.index, doc_count
            );
        }
        _ => warn!("Elasticsearch is not reachable, queries will fail until it is"),
    }

    let state = Arc::new(AppState { es_client });

    let app = build_router(&args.dist_dir).with_state(state);

    info!("Starting server on {}", args.listen);

    let listener = tokio::net::TcpListener::bind(&args.listen).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_router(dist_dir: &str) -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(greeting_handler))
        .route("/health", get(health_handler))
        .route("/near/{lat}/{lon}", get(near_handler))
        // The catch-all matches neither of these two paths
        .route("/all", get(missing_bounds_handler))
        .route("/all/", get(missing_bounds_handler))
        .route("/all/{*bounds}", get(all_handler))
        .nest_service("/dist", ServeDir::new(dist_dir))
        .fallback(not_found_handler)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Static greeting
async fn greeting_handler() -> &'static str {
    "Tamarack point server. Try /near/{lat}/{lon} or /all/{bounds}."
}

/// Liveness probe reporting Elasticsearch reachability
async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let healthy = state.es_client.health_check().await.unwrap_or(false);

    Json(HealthResponse {
        status: if healthy { "ok" } else { "degraded" },
        elasticsearch: healthy,
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    elasticsearch: bool,
}

/// Nearest points to a coordinate, distance-sorted and unrestricted by radius
async fn near_handler(
    State(state): State<Arc<AppState>>,
    Path((lat, lon)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let query = BoundsQuery::Near {
        lat: parse_coordinate(&lat)?,
        lon: parse_coordinate(&lon)?,
        radius: None,
    };

    let points = execute_bounds(&state.es_client, &query, RESULT_CAP).await?;

    Ok(Json(json!({ "points": points })))
}

/// Points matching a bounds expression, as a bare array
async fn all_handler(
    State(state): State<Arc<AppState>>,
    Path(bounds): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let query: BoundsQuery = bounds.parse()?;

    let points = execute_bounds(&state.es_client, &query, RESULT_CAP).await?;

    Ok(Json(Value::Array(points)))
}

/// A missing bounds expression is an error, not an empty result
async fn missing_bounds_handler() -> ApiError {
    ApiError::BadRequest("missing bounds expression".to_string())
}

/// Custom 404 page
async fn not_found_handler() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Sorry, Nothing at this URL.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use axum::response::IntoResponse;

    #[test]
    fn test_router_builds_without_route_conflicts() {
        let _ = build_router("dist");
    }

    #[tokio::test]
    async fn test_unknown_path_gets_custom_404() {
        let (status, body) = not_found_handler().await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, "Sorry, Nothing at this URL.");
    }

    #[tokio::test]
    async fn test_missing_bounds_is_a_400() {
        let response = missing_bounds_handler().await.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["message"], "missing bounds expression");
    }
}
