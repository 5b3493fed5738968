use axum::{
    extract::{Request, State},
    http::{Method, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::AppState;

/// Short-circuits CORS preflight requests.
///
/// Any OPTIONS request gets an empty 204 before routing, rate limiting, or
/// fallback handling run. This layer sits outside the CORS layer, so it
/// stamps the allow-* headers itself; letting the CORS layer answer
/// preflights would turn them into 200s.
pub async fn preflight_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    if req.method() != Method::OPTIONS {
        return next.run(req).await;
    }

    let cors = &state.config.server.cors;
    let mut response = StatusCode::NO_CONTENT.into_response();

    let headers = response.headers_mut();
    if let Some(origin) = cors.origin_header_value(req.headers().get(header::ORIGIN)) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    }
    if let Some(methods) = cors.methods_header_value() {
        headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, methods);
    }
    if let Some(allow_headers) = cors.headers_header_value() {
        headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, allow_headers);
    }

    response
}
