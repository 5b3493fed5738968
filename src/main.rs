mod cache;
mod config;
mod middleware;
mod models;
mod observability;
mod routes;
mod services;

#[cfg(test)]
mod tests;

use std::{net::SocketAddr, path::Path, sync::Arc, time::Duration};

use axum::{Router, http::HeaderName, routing::get};
use clap::Parser;
use tower_http::{
    limit::RequestBodyLimitLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer,
};

use crate::{
    cache::{Cache, CacheError},
    config::{ApiConfig, CacheConfig},
    services::BenchmarkService,
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ApiConfig>,
    pub cache: Option<Arc<dyn Cache>>,
    pub benchmarks: Arc<BenchmarkService>,
}

impl AppState {
    pub async fn new(config: ApiConfig) -> Result<Self, CacheError> {
        let cache: Option<Arc<dyn Cache>> = match &config.cache {
            CacheConfig::None => {
                tracing::info!("No cache configured, rate limiting disabled");
                None
            }
            CacheConfig::Memory(memory_config) => {
                tracing::info!(
                    max_entries = memory_config.max_entries,
                    "Using in-memory cache"
                );
                Some(Arc::new(cache::MemoryCache::new(memory_config)))
            }
            #[cfg(feature = "redis")]
            CacheConfig::Redis(redis_config) => {
                Some(Arc::new(cache::RedisCache::from_config(redis_config).await?))
            }
            #[cfg(not(feature = "redis"))]
            CacheConfig::Redis(_) => {
                return Err(CacheError::Internal(
                    "Redis cache is configured but the 'redis' feature is not compiled. \
                     Rebuild with: cargo build --features redis"
                        .to_string(),
                ));
            }
        };

        let benchmarks = Arc::new(BenchmarkService::new(
            cache.clone(),
            Duration::from_secs(config.cache.ttl().benchmarks_secs),
        ));

        Ok(Self {
            config: Arc::new(config),
            cache,
            benchmarks,
        })
    }
}

/// Build the application router.
///
/// Layer stack, outermost first: body limit, request tracing, preflight
/// short-circuiting, CORS, then the two non-preflight allow-* header
/// stamps. OPTIONS requests never reach routing or the per-IP limiter; the
/// preflight layer answers them with a 204 carrying its own CORS headers,
/// since the CORS layer below it would turn real preflights into 200s.
///
/// The rate limiter runs before path matching: it wraps the public routes
/// and the 404 fallback together, so unmatched paths consume budget and
/// 429 like matched ones. Only the health probes sit outside it.
pub fn build_app(config: &ApiConfig, state: AppState) -> Router {
    let limited = Router::new()
        .nest("/api", routes::api_routes())
        .fallback(routes::not_found)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::rate_limit_middleware,
        ));

    let mut app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/health/live", get(routes::health::liveness))
        .merge(limited);

    let cors = &config.server.cors;
    if let Some(value) = cors.methods_header_value() {
        app = app.layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static("access-control-allow-methods"),
            value,
        ));
    }
    if let Some(value) = cors.headers_header_value() {
        app = app.layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static("access-control-allow-headers"),
            value,
        ));
    }
    if let Some(cors_layer) = cors.clone().into_layer() {
        app = app.layer(cors_layer);
    }

    app.layer(axum::middleware::from_fn_with_state(
        state.clone(),
        middleware::preflight_middleware,
    ))
    .layer(TraceLayer::new_for_http())
    .layer(RequestBodyLimitLayer::new(config.server.body_limit_bytes))
    .with_state(state)
}

#[derive(Parser, Debug)]
#[command(version, about = "GarlicLLM marketing site API", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to config file (defaults to ./garlic-api.toml if it exists)
    #[arg(short, long, global = true)]
    config: Option<String>,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Start the API server (default)
    Serve,
    /// Write a commented default configuration file
    Init {
        /// Path to create the config file (defaults to ./garlic-api.toml)
        #[arg(short, long)]
        output: Option<String>,
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    match args.command {
        Some(Command::Init { output, force }) => run_init(output, force),
        Some(Command::Serve) | None => run_server(args.config.as_deref()).await,
    }
}

const DEFAULT_CONFIG_PATH: &str = "garlic-api.toml";

const DEFAULT_CONFIG: &str = r#"# GarlicLLM API configuration

[server]
host = "0.0.0.0"
port = 8787

# Only trust client-IP headers from the edge network's address ranges.
# [server.trusted_proxies]
# cidrs = ["173.245.48.0/20"]
# real_ip_header = "CF-Connecting-IP"

[server.cors]
enabled = true
allowed_origins = ["*"]
allowed_methods = ["GET", "POST", "OPTIONS"]
allowed_headers = ["Content-Type"]

[cache]
type = "memory"

# For multi-node deployments, use Redis instead (requires the 'redis' feature):
# [cache]
# type = "redis"
# url = "redis://:${REDIS_PASSWORD}@localhost:6379"

[limits.ip_rate_limits]
enabled = true
requests_per_minute = 100

[observability.logging]
level = "info"
format = "compact"
"#;

fn run_init(output: Option<String>, force: bool) {
    let path = output.unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    if Path::new(&path).exists() && !force {
        eprintln!("Error: {} already exists (use --force to overwrite)", path);
        std::process::exit(1);
    }

    if let Err(e) = std::fs::write(&path, DEFAULT_CONFIG) {
        eprintln!("Error: failed to write {}: {}", path, e);
        std::process::exit(1);
    }

    println!("Created configuration file: {}", path);
}

async fn run_server(explicit_config_path: Option<&str>) {
    let config = match explicit_config_path {
        Some(path) => match ApiConfig::from_file(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Failed to load config from {}: {}", path, e);
                std::process::exit(1);
            }
        },
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            match ApiConfig::from_file(DEFAULT_CONFIG_PATH) {
                Ok(c) => c,
                Err(e) => {
                    eprintln!("Failed to load config from {}: {}", DEFAULT_CONFIG_PATH, e);
                    std::process::exit(1);
                }
            }
        }
        None => ApiConfig::default(),
    };

    observability::init_tracing(&config.observability);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting GarlicLLM API");

    if config.limits.ip_rate_limits.enabled && config.cache.is_none() {
        tracing::warn!(
            "Rate limiting is enabled but no cache is configured. \
             All requests will be allowed. Configure [cache] to enforce limits."
        );
    }
    if config.server.trusted_proxies.dangerously_trust_all {
        tracing::warn!(
            "trusted_proxies.dangerously_trust_all is set. Clients connecting \
             directly can spoof their IP and bypass rate limiting."
        );
    }

    let state = AppState::new(config)
        .await
        .expect("Failed to initialize application state");

    let app = build_app(state.config.as_ref(), state.clone());

    let bind_addr = format!(
        "{}:{}",
        state.config.server.host, state.config.server.port
    );
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on http://{}", bind_addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .unwrap();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
