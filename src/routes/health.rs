//! Health check endpoints for probes and monitoring.

use axum::{Json, extract::State, response::IntoResponse};
use http::StatusCode;
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    /// Overall status: "healthy" or "degraded"
    pub status: String,
    pub version: String,
    pub subsystems: SubsystemStatus,
}

#[derive(Debug, Serialize)]
pub struct SubsystemStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<ComponentStatus>,
}

#[derive(Debug, Serialize)]
pub struct ComponentStatus {
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub latency_ms: u64,
}

/// Full health check with subsystem status.
///
/// A failing cache degrades the service (rate limiting disappears, catalog
/// reads fail) but the process itself is still serving, so this reports
/// "degraded" with a 200 rather than flipping to 503 and getting the pod
/// restarted.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let mut status = "healthy";
    let mut subsystems = SubsystemStatus { cache: None };

    if let Some(cache) = &state.cache {
        let start = std::time::Instant::now();
        let cache_healthy = cache.get_bytes("__health_check__").await.is_ok();
        let latency_ms = start.elapsed().as_millis() as u64;

        if !cache_healthy {
            status = "degraded";
        }

        subsystems.cache = Some(ComponentStatus {
            healthy: cache_healthy,
            message: if cache_healthy {
                None
            } else {
                Some("Cache connection failed".to_string())
            },
            latency_ms,
        });
    }

    (
        StatusCode::OK,
        Json(HealthStatus {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            subsystems,
        }),
    )
}

/// Minimal liveness probe.
pub async fn liveness() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
