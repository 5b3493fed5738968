//! Application-level tests driving the full router through `oneshot`.

use axum::{Router, body::Body};
use http::{Request, Response, StatusCode, header};
use serde_json::Value;
use tower::ServiceExt;

use crate::{
    AppState, build_app,
    config::{ApiConfig, CacheConfig, MemoryCacheConfig},
};

async fn test_app(config: ApiConfig) -> Router {
    let state = AppState::new(config.clone()).await.unwrap();
    build_app(&config, state)
}

/// Default config: permissive CORS, no cache, so no rate limiting.
async fn app_without_cache() -> Router {
    test_app(ApiConfig::default()).await
}

/// Memory cache with a small request budget for limit tests.
async fn app_with_limit(requests_per_minute: u32) -> Router {
    let mut config = ApiConfig::default();
    config.cache = CacheConfig::Memory(MemoryCacheConfig::default());
    config.limits.ip_rate_limits.requests_per_minute = requests_per_minute;
    test_app(config).await
}

async fn get(app: &Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

async fn request(app: &Router, method: &str, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

// ===== CORS and preflight =====

#[tokio::test]
async fn test_preflight_returns_204_on_any_path() {
    let app = app_without_cache().await;

    for uri in ["/api/benchmarks", "/api/compare", "/nowhere", "/"] {
        let response = request(&app, "OPTIONS", uri).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT, "uri {}", uri);

        let headers = response.headers().clone();
        assert_eq!(
            headers.get("access-control-allow-origin").unwrap(),
            "*",
            "uri {}",
            uri
        );
        assert!(body_bytes(response).await.is_empty());
    }
}

#[tokio::test]
async fn test_browser_preflight_still_gets_204() {
    let app = app_without_cache().await;

    // A real browser preflight carries Origin and the requested method
    let preflight = Request::builder()
        .method("OPTIONS")
        .uri("/api/benchmarks")
        .header("Origin", "https://garlicllm.com")
        .header("Access-Control-Request-Method", "GET")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(preflight).await.unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let headers = response.headers();
    assert_eq!(headers.get("access-control-allow-origin").unwrap(), "*");
    assert_eq!(
        headers.get("access-control-allow-methods").unwrap(),
        "GET, POST, OPTIONS"
    );
    assert_eq!(
        headers.get("access-control-allow-headers").unwrap(),
        "Content-Type"
    );
}

#[tokio::test]
async fn test_cors_headers_on_regular_responses() {
    let app = app_without_cache().await;

    let response = get(&app, "/api/status").await;
    let headers = response.headers();
    assert_eq!(headers.get("access-control-allow-origin").unwrap(), "*");
    assert_eq!(
        headers.get("access-control-allow-methods").unwrap(),
        "GET, POST, OPTIONS"
    );
    assert_eq!(
        headers.get("access-control-allow-headers").unwrap(),
        "Content-Type"
    );
}

#[tokio::test]
async fn test_cors_headers_on_error_responses() {
    let app = app_without_cache().await;

    let response = get(&app, "/no/such/route").await;
    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "*"
    );
}

// ===== Fallback =====

#[tokio::test]
async fn test_unknown_route_returns_404_json() {
    let app = app_without_cache().await;

    let response = get(&app, "/api/unknown").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await, serde_json::json!({"error": "Not found"}));
}

#[tokio::test]
async fn test_unknown_method_returns_404_shape_via_fallback() {
    let app = app_without_cache().await;

    let response = request(&app, "POST", "/completely/unknown").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await, serde_json::json!({"error": "Not found"}));
}

// ===== Benchmarks =====

#[tokio::test]
async fn test_benchmarks_returns_catalog() {
    let app = app_without_cache().await;

    let response = get(&app, "/api/benchmarks").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CACHE_CONTROL).unwrap(),
        "public, max-age=300"
    );

    let body = body_json(response).await;
    let models = body["models"].as_array().unwrap();
    assert!(!models.is_empty());
    assert!(body["last_updated"].is_string());

    for model in models {
        assert!(model["id"].is_string());
        assert!(model["name"].is_string());
        assert!(model["source"].is_string());
        for axis in ["coding", "reasoning", "multimodal", "efficiency"] {
            let score = model["scores"][axis].as_u64().unwrap();
            assert!(score <= 100);
        }
        let confidence = model["confidence"].as_str().unwrap();
        assert!(matches!(confidence, "high" | "medium" | "low"));
    }
}

#[tokio::test]
async fn test_benchmarks_with_memory_cache_mirror() {
    let app = app_with_limit(100).await;

    let first = body_json(get(&app, "/api/benchmarks").await).await;
    let second = body_json(get(&app, "/api/benchmarks").await).await;

    // The second read comes from the mirror, so the timestamp is frozen
    assert_eq!(first["last_updated"], second["last_updated"]);
}

// ===== Compare =====

#[tokio::test]
async fn test_compare_filters_in_catalog_order() {
    let app = app_without_cache().await;

    let response = get(&app, "/api/compare?models=claude-4.5,garlic-xl").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CACHE_CONTROL).unwrap(),
        "public, max-age=300"
    );

    let body = body_json(response).await;
    let ids: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["id"].as_str().unwrap())
        .collect();
    // Catalog order regardless of request order
    assert_eq!(ids, vec!["garlic-xl", "claude-4.5"]);

    let reversed = body_json(get(&app, "/api/compare?models=garlic-xl,claude-4.5").await).await;
    assert_eq!(body, reversed);
}

#[tokio::test]
async fn test_compare_unknown_ids_yield_empty_array() {
    let app = app_without_cache().await;

    let response = get(&app, "/api/compare?models=never-shipped").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, serde_json::json!([]));
}

#[tokio::test]
async fn test_compare_without_models_param_is_400() {
    let app = app_without_cache().await;

    for uri in ["/api/compare", "/api/compare?models="] {
        let response = get(&app, uri).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "uri {}", uri);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"error": "Missing models parameter"})
        );
    }
}

// ===== Status =====

#[tokio::test]
async fn test_status_reports_ok_and_version() {
    let app = app_without_cache().await;

    let response = get(&app, "/api/status").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::CACHE_CONTROL).is_none());

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], "1.0.0");
    assert!(body["timestamp"].is_string());
}

// ===== OG images =====

#[tokio::test]
async fn test_og_image_defaults_to_dark() {
    let app = app_without_cache().await;

    let response = get(&app, "/api/og").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "image/svg+xml"
    );
    assert_eq!(
        response.headers().get(header::CACHE_CONTROL).unwrap(),
        "public, max-age=86400"
    );

    let svg = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(svg.contains("fill=\"#020712\""));
    assert!(svg.contains(">GarlicLLM<"));
}

#[tokio::test]
async fn test_og_image_light_theme_and_title() {
    let app = app_without_cache().await;

    let response = get(&app, "/api/og?title=Pricing&theme=light").await;
    let svg = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(svg.contains("fill=\"#F8FAFC\""));
    assert!(svg.contains(">Pricing<"));
}

#[tokio::test]
async fn test_og_image_empty_theme_is_dark() {
    let app = app_without_cache().await;

    let response = get(&app, "/api/og?theme=").await;
    let svg = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(svg.contains("fill=\"#020712\""));
}

#[tokio::test]
async fn test_og_image_unknown_theme_falls_to_light() {
    let app = app_without_cache().await;

    let response = get(&app, "/api/og?theme=solarized").await;
    let svg = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(svg.contains("fill=\"#F8FAFC\""));
}

#[tokio::test]
async fn test_og_image_is_byte_stable() {
    let app = app_without_cache().await;

    let a = body_bytes(get(&app, "/api/og?title=Docs").await).await;
    let b = body_bytes(get(&app, "/api/og?title=Docs").await).await;
    assert_eq!(a, b);
}

// ===== Rate limiting =====

#[tokio::test]
async fn test_rate_limit_blocks_after_budget() {
    let limit = 3;
    let app = app_with_limit(limit).await;

    // Without ConnectInfo every request shares the "unknown" client counter
    for i in 1..=limit {
        let response = get(&app, "/api/status").await;
        assert_eq!(response.status(), StatusCode::OK, "request {}", i);
        assert_eq!(
            response.headers().get("X-RateLimit-Limit").unwrap(),
            &limit.to_string()
        );
    }

    let blocked = get(&app, "/api/status").await;
    assert_eq!(blocked.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        blocked.headers().get("X-RateLimit-Remaining").unwrap(),
        "0"
    );
    assert!(blocked.headers().contains_key("Retry-After"));
    assert_eq!(
        body_json(blocked).await,
        serde_json::json!({"error": "Rate limit exceeded"})
    );
}

#[tokio::test]
async fn test_rate_limit_headers_count_down() {
    let app = app_with_limit(10).await;

    let first = get(&app, "/api/status").await;
    assert_eq!(first.headers().get("X-RateLimit-Remaining").unwrap(), "9");

    let second = get(&app, "/api/status").await;
    assert_eq!(second.headers().get("X-RateLimit-Remaining").unwrap(), "8");
}

#[tokio::test]
async fn test_preflight_bypasses_rate_limit() {
    let limit = 2;
    let app = app_with_limit(limit).await;

    for _ in 0..limit {
        get(&app, "/api/status").await;
    }
    let blocked = get(&app, "/api/status").await;
    assert_eq!(blocked.status(), StatusCode::TOO_MANY_REQUESTS);

    // OPTIONS still succeeds after the budget is spent
    let preflight = request(&app, "OPTIONS", "/api/status").await;
    assert_eq!(preflight.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_unmatched_paths_are_rate_limited() {
    let limit = 1;
    let app = app_with_limit(limit).await;

    // Exhaust the budget on a matched route
    let first = get(&app, "/api/status").await;
    assert_eq!(first.status(), StatusCode::OK);

    // The limiter runs before path matching, so unknown paths 429 too
    let blocked = get(&app, "/api/unknown").await;
    assert_eq!(blocked.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        body_json(blocked).await,
        serde_json::json!({"error": "Rate limit exceeded"})
    );
}

#[tokio::test]
async fn test_unmatched_paths_consume_budget() {
    let app = app_with_limit(2).await;

    // Two 404s spend the whole budget
    for _ in 0..2 {
        let response = get(&app, "/nowhere").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    let blocked = get(&app, "/api/status").await;
    assert_eq!(blocked.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_health_is_not_rate_limited() {
    let app = app_with_limit(1).await;

    get(&app, "/api/status").await;
    let blocked = get(&app, "/api/status").await;
    assert_eq!(blocked.status(), StatusCode::TOO_MANY_REQUESTS);

    let health = get(&app, "/health").await;
    assert_eq!(health.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_no_cache_means_no_rate_limiting() {
    let app = app_without_cache().await;

    for _ in 0..150 {
        let response = get(&app, "/api/status").await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn test_disabled_limits_pass_through() {
    let mut config = ApiConfig::default();
    config.cache = CacheConfig::Memory(MemoryCacheConfig::default());
    config.limits.ip_rate_limits.enabled = false;
    config.limits.ip_rate_limits.requests_per_minute = 1;
    let app = test_app(config).await;

    for _ in 0..5 {
        let response = get(&app, "/api/status").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(!response.headers().contains_key("X-RateLimit-Limit"));
    }
}

// ===== Health =====

#[tokio::test]
async fn test_health_reports_cache_subsystem() {
    let app = app_with_limit(100).await;

    let response = get(&app, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["subsystems"]["cache"]["healthy"], true);
}

#[tokio::test]
async fn test_health_without_cache_omits_subsystem() {
    let app = app_without_cache().await;

    let body = body_json(get(&app, "/health").await).await;
    assert_eq!(body["status"], "healthy");
    assert!(body["subsystems"].get("cache").is_none());
}

#[tokio::test]
async fn test_liveness() {
    let app = app_without_cache().await;

    let response = get(&app, "/health/live").await;
    assert_eq!(response.status(), StatusCode::OK);
}
