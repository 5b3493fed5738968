use std::{net::IpAddr, time::Duration};

use http::{HeaderName, HeaderValue, Method};
use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request body size limit in bytes.
    /// The API is GET-only, so this is deliberately small.
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,

    /// Trusted proxy configuration for extracting real client IPs.
    #[serde(default)]
    pub trusted_proxies: TrustedProxiesConfig,

    /// CORS configuration.
    #[serde(default)]
    pub cors: CorsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            body_limit_bytes: default_body_limit(),
            trusted_proxies: TrustedProxiesConfig::default(),
            cors: CorsConfig::default(),
        }
    }
}

fn default_host() -> IpAddr {
    "0.0.0.0".parse().unwrap()
}

fn default_port() -> u16 {
    8787
}

fn default_body_limit() -> usize {
    64 * 1024 // 64 KB
}

/// Configuration for trusted reverse proxies.
///
/// **Security Note:** Proxy header spoofing is a serious vulnerability. Only trust
/// proxy headers when the connecting client is from a known proxy IP/CIDR range.
///
/// - `dangerously_trust_all: true` - **DANGEROUS**: Trusts proxy headers from ANY
///   source. Only use when the API is not directly reachable from the internet
///   (e.g. behind an edge network that strips/rewrites headers).
///
/// - `cidrs: ["10.0.0.0/8"]` - Trust proxy headers only when the connecting IP is
///   within one of the specified CIDR ranges. This is the recommended approach.
///
/// When proxy headers are trusted, X-Forwarded-For is parsed right-to-left, skipping
/// IPs that are within trusted CIDRs, to find the first untrusted (client) IP.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrustedProxiesConfig {
    /// Trust all proxies (use the real-IP header as-is).
    ///
    /// **WARNING: This is a security risk!** If attackers can connect directly
    /// to the API, they can spoof any IP and bypass rate limiting entirely.
    #[serde(default)]
    pub dangerously_trust_all: bool,

    /// List of trusted proxy CIDR ranges (e.g., ["10.0.0.0/8", "172.16.0.0/12"]).
    ///
    /// Proxy headers are only trusted when the connecting IP is within one of
    /// these ranges. This prevents IP spoofing from untrusted sources.
    #[serde(default)]
    pub cidrs: Vec<String>,

    /// Header to use for the real client IP.
    /// Common values: "CF-Connecting-IP", "X-Forwarded-For", "X-Real-IP"
    #[serde(default = "default_real_ip_header")]
    pub real_ip_header: String,
}

impl Default for TrustedProxiesConfig {
    fn default() -> Self {
        Self {
            dangerously_trust_all: false,
            cidrs: vec![],
            real_ip_header: default_real_ip_header(),
        }
    }
}

impl TrustedProxiesConfig {
    /// Parse the CIDR strings into IpNet objects.
    ///
    /// Invalid CIDRs are logged as warnings and skipped.
    pub fn parsed_cidrs(&self) -> Vec<IpNet> {
        self.cidrs
            .iter()
            .filter_map(|cidr_str| {
                cidr_str.parse::<IpNet>().ok().or_else(|| {
                    tracing::warn!(cidr = %cidr_str, "Invalid CIDR in trusted_proxies config, skipping");
                    None
                })
            })
            .collect()
    }

    /// Check if an IP address is within any of the trusted CIDR ranges.
    pub fn is_trusted_ip(&self, ip: IpAddr, parsed_cidrs: &[IpNet]) -> bool {
        if self.dangerously_trust_all {
            return true;
        }
        parsed_cidrs.iter().any(|cidr| cidr.contains(&ip))
    }

    /// Returns true if proxy headers should potentially be trusted.
    ///
    /// This doesn't mean headers ARE trusted - the connecting IP must still
    /// be validated against the CIDRs (unless dangerously_trust_all is set).
    pub fn is_configured(&self) -> bool {
        self.dangerously_trust_all || !self.cidrs.is_empty()
    }
}

fn default_real_ip_header() -> String {
    "CF-Connecting-IP".to_string()
}

/// CORS configuration.
///
/// The API is consumed by browser clients on other domains, so the default
/// is wide open: any origin, `GET, POST, OPTIONS`, and `Content-Type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CorsConfig {
    /// Enable CORS.
    #[serde(default = "default_cors_enabled")]
    pub enabled: bool,

    /// Allowed origins. `["*"]` allows any origin.
    #[serde(default = "default_cors_origins")]
    pub allowed_origins: Vec<String>,

    /// Allowed HTTP methods.
    #[serde(default = "default_cors_methods")]
    pub allowed_methods: Vec<String>,

    /// Allowed headers.
    #[serde(default = "default_cors_headers")]
    pub allowed_headers: Vec<String>,

    /// Max age for preflight cache in seconds.
    #[serde(default = "default_cors_max_age")]
    pub max_age_secs: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: default_cors_enabled(),
            allowed_origins: default_cors_origins(),
            allowed_methods: default_cors_methods(),
            allowed_headers: default_cors_headers(),
            max_age_secs: default_cors_max_age(),
        }
    }
}

impl CorsConfig {
    /// Build a CorsLayer from the configuration.
    ///
    /// Returns None if CORS is disabled.
    pub fn into_layer(self) -> Option<CorsLayer> {
        if !self.enabled {
            tracing::debug!("CORS is disabled");
            return None;
        }

        let allow_origin = if self.allowed_origins.len() == 1 && self.allowed_origins[0] == "*" {
            AllowOrigin::any()
        } else {
            let origins: Vec<HeaderValue> = self
                .allowed_origins
                .iter()
                .filter_map(|origin| {
                    origin.parse().ok().or_else(|| {
                        tracing::warn!(origin = %origin, "Invalid CORS origin, skipping");
                        None
                    })
                })
                .collect();

            tracing::info!(origins = ?self.allowed_origins, "CORS: Allowing specific origins");
            AllowOrigin::list(origins)
        };

        let methods: Vec<Method> = self
            .allowed_methods
            .iter()
            .filter_map(|m| {
                m.parse().ok().or_else(|| {
                    tracing::warn!(method = %m, "Invalid CORS method, skipping");
                    None
                })
            })
            .collect();

        let headers: Vec<HeaderName> = self
            .allowed_headers
            .iter()
            .filter_map(|h| {
                h.parse().ok().or_else(|| {
                    tracing::warn!(header = %h, "Invalid CORS header, skipping");
                    None
                })
            })
            .collect();

        Some(
            CorsLayer::new()
                .allow_origin(allow_origin)
                .allow_methods(AllowMethods::list(methods))
                .allow_headers(AllowHeaders::list(headers))
                .max_age(Duration::from_secs(self.max_age_secs)),
        )
    }

    /// The `Access-Control-Allow-Origin` value for a short-circuited
    /// preflight response. Wildcard configs always allow; otherwise the
    /// request origin is echoed back when it is on the allowlist.
    pub fn origin_header_value(&self, request_origin: Option<&HeaderValue>) -> Option<HeaderValue> {
        if !self.enabled {
            return None;
        }

        if self.allowed_origins.len() == 1 && self.allowed_origins[0] == "*" {
            return Some(HeaderValue::from_static("*"));
        }

        let origin = request_origin?;
        let origin_str = origin.to_str().ok()?;
        self.allowed_origins
            .iter()
            .any(|allowed| allowed == origin_str)
            .then(|| origin.clone())
    }

    /// The configured methods as a single header value, for stamping
    /// `Access-Control-Allow-Methods` onto non-preflight responses.
    pub fn methods_header_value(&self) -> Option<HeaderValue> {
        HeaderValue::try_from(self.allowed_methods.join(", ")).ok()
    }

    /// The configured headers as a single header value, for stamping
    /// `Access-Control-Allow-Headers` onto non-preflight responses.
    pub fn headers_header_value(&self) -> Option<HeaderValue> {
        HeaderValue::try_from(self.allowed_headers.join(", ")).ok()
    }
}

fn default_cors_enabled() -> bool {
    true
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_cors_methods() -> Vec<String> {
    vec!["GET".to_string(), "POST".to_string(), "OPTIONS".to_string()]
}

fn default_cors_headers() -> Vec<String> {
    vec!["Content-Type".to_string()]
}

fn default_cors_max_age() -> u64 {
    3600
}
