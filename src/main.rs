//! osm-cache - A caching reverse proxy for map tiles.
//!
//! This binary starts the HTTP server and configures all components.

use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use osm_cache::{
    config::Config,
    server::{create_router, RouterConfig},
    tile::ProviderRegistry,
    upstream::HttpFetcher,
};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();
    run_serve(config).await
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: Config) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let fetcher = match HttpFetcher::new(config.upstream_timeout()) {
        Ok(fetcher) => Arc::new(fetcher),
        Err(e) => {
            error!("Failed to create HTTP client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let registry = match ProviderRegistry::new(
        config.provider_configs(),
        config.default_provider.as_deref(),
        fetcher,
    ) {
        Ok(registry) => registry,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("osm-cache v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  Tiles path: {}", config.tiles_path.display());
    info!("  Base path: {}", config.normalized_base_path());
    info!("  Upstream timeout: {}s", config.upstream_timeout);
    info!("  CORS origins: {}", config.allowed_origins().join(", "));
    for provider in registry.iter() {
        info!(
            "  Provider: {} -> {} ({})",
            provider.name(),
            provider.url(),
            provider.dir().display()
        );
    }
    info!("  Default provider: {}", registry.default_provider().name());

    let router_config = build_router_config(&config);
    let router = create_router(Arc::new(registry), router_config);

    let addr = config.bind_address();
    let base = match config.normalized_base_path().as_str() {
        "/" => String::new(),
        base => base.to_string(),
    };

    info!("");
    info!("  Server listening on: http://{}", addr);
    info!("    curl http://{}{}/health", addr, base);
    info!("    curl -o tile.png http://{}{}/0/0/0.png", addr, base);
    info!("");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "osm_cache=debug,tower_http=debug"
    } else {
        "osm_cache=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build RouterConfig from the application Config.
fn build_router_config(config: &Config) -> RouterConfig {
    RouterConfig::new()
        .with_base_path(config.normalized_base_path())
        .with_cors_origins(config.allowed_origins())
        .with_cache_max_age(config.cache_max_age)
        .with_tracing(!config.no_tracing)
}
