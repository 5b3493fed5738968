use std::net::IpAddr;

use axum::{
    Json,
    extract::{ConnectInfo, Request, State},
    http::{HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use ipnet::IpNet;
use serde_json::json;

use crate::{
    AppState,
    cache::{CacheKeys, RateLimitResult},
    config::TrustedProxiesConfig,
};

#[derive(Debug)]
pub enum RateLimitError {
    Exceeded {
        limit: u32,
        current: i64,
        retry_after: u64,
    },
    Internal(String),
}

impl IntoResponse for RateLimitError {
    fn into_response(self) -> Response {
        match self {
            RateLimitError::Exceeded {
                limit,
                current,
                retry_after,
            } => {
                let mut response = (
                    StatusCode::TOO_MANY_REQUESTS,
                    Json(json!({ "error": "Rate limit exceeded" })),
                )
                    .into_response();

                let remaining = (limit as i64).saturating_sub(current).max(0) as u32;
                let headers = response.headers_mut();
                if let Ok(v) = HeaderValue::try_from(limit.to_string()) {
                    headers.insert("X-RateLimit-Limit", v);
                }
                if let Ok(v) = HeaderValue::try_from(remaining.to_string()) {
                    headers.insert("X-RateLimit-Remaining", v);
                }
                if let Ok(v) = HeaderValue::try_from(retry_after.to_string()) {
                    headers.insert("X-RateLimit-Reset", v.clone());
                    headers.insert("Retry-After", v);
                }

                response
            }
            RateLimitError::Internal(msg) => {
                tracing::error!(error = %msg, "rate limit check failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal error" })),
                )
                    .into_response()
            }
        }
    }
}

/// Per-client rate limiting for the API routes.
///
/// Clients are keyed by IP, falling back to the literal `"unknown"` when no
/// address can be determined. All unidentifiable clients therefore share one
/// counter. Disabled limits and a missing cache both mean requests pass
/// through unchecked.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, RateLimitError> {
    let cache = match &state.cache {
        Some(c) => c,
        None => return Ok(next.run(req).await),
    };

    let ip_config = &state.config.limits.ip_rate_limits;
    if !ip_config.enabled {
        return Ok(next.run(req).await);
    }

    let client_id = extract_client_ip(&req, &state.config.server.trusted_proxies)
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let limit = ip_config.requests_per_minute;
    let window_secs = state.config.cache.ttl().rate_limit_secs;

    let result = cache
        .check_and_incr_rate_limit(&CacheKeys::rate_limit(&client_id), limit, window_secs)
        .await
        .map_err(|e| RateLimitError::Internal(e.to_string()))?;

    if !result.allowed {
        tracing::debug!(client = %client_id, current = result.current, "rate limit exceeded");
        return Err(RateLimitError::Exceeded {
            limit,
            current: result.current,
            retry_after: result.reset_secs,
        });
    }

    let response = next.run(req).await;
    Ok(add_rate_limit_headers(response, &result))
}

/// Extract the client IP address from the request.
///
/// Proxy headers are only trusted when `dangerously_trust_all` is set or the
/// connecting IP falls inside a configured trusted CIDR. When trusted, the
/// configured header (CF-Connecting-IP by default) is parsed right-to-left,
/// skipping trusted proxy hops, so a client cannot spoof its way to a fresh
/// counter by prepending fake addresses.
pub fn extract_client_ip(req: &Request, trusted_proxies: &TrustedProxiesConfig) -> Option<IpAddr> {
    let connecting_ip = req
        .extensions()
        .get::<ConnectInfo<std::net::SocketAddr>>()
        .map(|ci| ci.0.ip());

    if !trusted_proxies.is_configured() {
        return connecting_ip;
    }

    let parsed_cidrs = trusted_proxies.parsed_cidrs();

    let should_trust_headers = match connecting_ip {
        Some(ip) => trusted_proxies.is_trusted_ip(ip, &parsed_cidrs),
        None => trusted_proxies.dangerously_trust_all,
    };

    if !should_trust_headers {
        if let Some(ip) = connecting_ip
            && req.headers().contains_key(&trusted_proxies.real_ip_header)
        {
            tracing::debug!(
                connecting_ip = %ip,
                header = %trusted_proxies.real_ip_header,
                "Ignoring proxy header from untrusted IP"
            );
        }
        return connecting_ip;
    }

    if let Some(client_ip) = extract_ip_from_forwarded(req, trusted_proxies, &parsed_cidrs) {
        return Some(client_ip);
    }

    // X-Real-IP carries a single address, no chain parsing needed
    if let Some(header_value) = req.headers().get("X-Real-IP")
        && let Ok(header_str) = header_value.to_str()
        && let Ok(ip) = header_str.trim().parse::<IpAddr>()
    {
        return Some(ip);
    }

    connecting_ip
}

/// Right-to-left parse of the configured forwarding header.
///
/// Each proxy appends the address it received the request from, so the first
/// entry not inside a trusted CIDR, scanning from the right, is the client.
fn extract_ip_from_forwarded(
    req: &Request,
    trusted_proxies: &TrustedProxiesConfig,
    parsed_cidrs: &[IpNet],
) -> Option<IpAddr> {
    let header_value = req.headers().get(&trusted_proxies.real_ip_header)?;
    let header_str = header_value.to_str().ok()?;

    let ips: Vec<IpAddr> = header_str
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    if ips.is_empty() {
        return None;
    }

    if trusted_proxies.dangerously_trust_all {
        return ips.into_iter().next();
    }

    ips.into_iter()
        .rev()
        .find(|&ip| !trusted_proxies.is_trusted_ip(ip, parsed_cidrs))
}

pub fn add_rate_limit_headers(mut response: Response, rate_limit: &RateLimitResult) -> Response {
    let remaining = (rate_limit.limit as i64)
        .saturating_sub(rate_limit.current)
        .max(0) as u32;

    let limit_value = HeaderValue::try_from(rate_limit.limit.to_string())
        .unwrap_or_else(|_| HeaderValue::from_static("0"));
    let remaining_value = HeaderValue::try_from(remaining.to_string())
        .unwrap_or_else(|_| HeaderValue::from_static("0"));
    let reset_value = HeaderValue::try_from(rate_limit.reset_secs.to_string())
        .unwrap_or_else(|_| HeaderValue::from_static("0"));

    let headers = response.headers_mut();
    headers.insert("X-RateLimit-Limit", limit_value);
    headers.insert("X-RateLimit-Remaining", remaining_value);
    headers.insert("X-RateLimit-Reset", reset_value);

    response
}
