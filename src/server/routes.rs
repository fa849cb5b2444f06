//! Router configuration for osm-cache.
//!
//! This module defines the HTTP routes and applies CORS and tracing
//! middleware.
//!
//! # Route Structure
//!
//! ```text
//! {base}/health                          - Health check
//! {base}/providers                       - Provider listing
//! {base}/seed                            - Bounding-box prefetch (POST)
//! {base}/{z}/{x}/{y}.{format}            - Tile from the default provider
//! {base}/{provider}/{z}/{x}/{y}.{format} - Tile from a named provider
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use osm_cache::server::{create_router, RouterConfig};
//!
//! let config = RouterConfig::new()
//!     .with_base_path("/maps")
//!     .with_cors_origins(vec!["https://example.com".to_string()]);
//!
//! let router = create_router(Arc::new(registry), config);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use http::header::{HeaderName, CONTENT_TYPE};
use http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{health_handler, providers_handler, seed_handler, tile_handler, AppState};
use crate::tile::ProviderRegistry;
use crate::upstream::TileFetcher;

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Path prefix for every route ("/" = mounted at the root)
    pub base_path: String,

    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Cache-Control max-age in seconds
    pub cache_max_age: u32,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RouterConfig {
    /// Create a new router configuration.
    ///
    /// By default:
    /// - Routes are mounted at `/`
    /// - CORS allows any origin
    /// - Cache max-age is 1 day (86400 seconds)
    /// - Tracing is enabled
    pub fn new() -> Self {
        Self {
            base_path: "/".to_string(),
            cors_origins: None,
            cache_max_age: 86400,
            enable_tracing: true,
        }
    }

    /// Mount all routes under `base_path`.
    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Allow any CORS origin.
    pub fn with_cors_any_origin(mut self) -> Self {
        self.cors_origins = None;
        self
    }

    /// Set the Cache-Control max-age in seconds.
    pub fn with_cache_max_age(mut self, seconds: u32) -> Self {
        self.cache_max_age = seconds;
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router.
///
/// The static `/health`, `/providers` and `/seed` routes take precedence
/// over the tile routes. A provider named `providers` or `health` is still
/// reachable through its four-segment tile path.
pub fn create_router<F>(registry: Arc<ProviderRegistry<F>>, config: RouterConfig) -> Router
where
    F: TileFetcher + 'static,
{
    let app_state = AppState::with_cache_max_age(registry, config.cache_max_age);
    let cors = build_cors_layer(&config);

    // Both tile shapes go through one catch-all; the router rejects two
    // parameter routes whose first segments are named differently.
    let routes = Router::new()
        .route("/health", get(health_handler))
        .route("/providers", get(providers_handler::<F>))
        .route("/seed", post(seed_handler::<F>))
        .route("/{*tile_path}", get(tile_handler::<F>))
        .with_state(app_state);

    let base_path = config.base_path.trim_end_matches('/');
    let router = if base_path.is_empty() {
        routes
    } else {
        Router::new().nest(base_path, routes)
    };

    let router = router.layer(cors);

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::HEAD,
            Method::POST,
            Method::PUT,
            Method::OPTIONS,
        ])
        .allow_headers([HeaderName::from_static("x-requested-with"), CONTENT_TYPE])
        .max_age(Duration::from_secs(86400)); // 24 hours

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) if origins.is_empty() => cors,
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
