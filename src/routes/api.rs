//! Public API route handlers.

use axum::{
    Json,
    Router,
    extract::{Query, State},
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::{SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::json;

use crate::{
    AppState,
    models::{BenchmarkCatalog, BenchmarkRecord},
    routes::error::ApiError,
    services::{OgImageParams, render_og_image},
};

/// Catalog responses stay fresh for five minutes at the edge.
const CATALOG_CACHE_CONTROL: &str = "public, max-age=300";
/// Social cards are deterministic, so a day is safe.
const OG_CACHE_CONTROL: &str = "public, max-age=86400";

/// The four public routes. The rate limiter is applied by the caller so it
/// also covers the 404 fallback.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/benchmarks", get(get_benchmarks))
        .route("/compare", get(get_compare))
        .route("/status", get(get_status))
        .route("/og", get(get_og_image))
}

async fn get_benchmarks(State(state): State<AppState>) -> Result<Response, ApiError> {
    let catalog: BenchmarkCatalog = state.benchmarks.catalog().await?;

    let mut response = Json(catalog).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(CATALOG_CACHE_CONTROL),
    );
    Ok(response)
}

#[derive(Debug, Deserialize)]
struct CompareParams {
    models: Option<String>,
}

async fn get_compare(
    State(state): State<AppState>,
    Query(params): Query<CompareParams>,
) -> Result<Response, ApiError> {
    // An empty value is treated the same as an absent parameter
    let models_param = params
        .models
        .filter(|m| !m.is_empty())
        .ok_or(ApiError::MissingModelsParam)?;

    let ids: Vec<&str> = models_param.split(',').collect();
    let records: Vec<BenchmarkRecord> = state.benchmarks.compare(&ids);

    let mut response = Json(records).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(CATALOG_CACHE_CONTROL),
    );
    Ok(response)
}

async fn get_status() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn get_og_image(Query(params): Query<OgImageParams>) -> Response {
    let svg = render_og_image(&params);

    (
        [
            (header::CONTENT_TYPE, "image/svg+xml"),
            (header::CACHE_CONTROL, OG_CACHE_CONTROL),
        ],
        svg,
    )
        .into_response()
}

/// Fallback for any path the router doesn't know.
pub async fn not_found() -> ApiError {
    ApiError::NotFound
}
