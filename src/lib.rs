//! # osm-cache
//!
//! A caching reverse proxy for raster map tiles.
//!
//! Tiles are addressed by zoom/column/row. The first request for a tile
//! downloads it from one of several configured upstream providers and stores
//! it under `{dir}/{z}/{x}/{y}.{ext}`; every later request is served from
//! that file without a network round trip.
//!
//! ## Features
//!
//! - **Read-through disk cache**: one deterministic file per tile and provider
//! - **Multiple providers**: named upstreams with URL templates and a fixed default
//! - **Request coalescing**: concurrent misses for one tile share one download
//! - **Seeding**: prefetch every tile of a bounding box
//!
//! ## Architecture
//!
//! - [`tile`] - Providers, the disk cache and tile formatting helpers
//! - [`upstream`] - The [`TileFetcher`] seam and its `reqwest` implementation
//! - [`server`] - Axum-based HTTP server and routes
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use osm_cache::{create_router, HttpFetcher, ProviderConfig, ProviderRegistry, RouterConfig};
//! use osm_cache::upstream::DEFAULT_UPSTREAM_TIMEOUT;
//!
//! #[tokio::main]
//! async fn main() {
//!     let fetcher = Arc::new(HttpFetcher::new(DEFAULT_UPSTREAM_TIMEOUT).unwrap());
//!     let registry = ProviderRegistry::new(
//!         vec![ProviderConfig::new(
//!             "osm",
//!             "https://tile.openstreetmap.org/{z}/{x}/{y}.png",
//!             "tiles/osm",
//!         )],
//!         None,
//!         fetcher,
//!     )
//!     .unwrap();
//!
//!     let router = create_router(Arc::new(registry), RouterConfig::new());
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await.unwrap();
//!     axum::serve(listener, router).await.unwrap();
//! }
//! ```

pub mod config;
pub mod error;
pub mod server;
pub mod tile;
pub mod upstream;

// Re-export commonly used types
pub use config::{Config, ProviderArg};
pub use error::{ConfigError, FetchError, PersistError, TileError};
pub use server::{
    create_router, health_handler, providers_handler, seed_handler, tile_handler, AppState,
    ErrorResponse, HealthResponse, ProvidersResponse, RouterConfig,
};
pub use tile::{
    format_tile_dir_path, format_tile_path, format_url, BoundingBox, DiskCache, Provider,
    ProviderConfig, ProviderRegistry, QueryParam, SeedReport, Tile, TileFormat, TileKey,
    TileResponse, MAX_SEED_TILES,
};
pub use upstream::{HttpFetcher, TileFetcher};
