//! HTTP server layer for osm-cache.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │      GET {base}/{provider}/{z}/{x}/{y}.{format}                 │
//! │                                                                 │
//! │  ┌──────────────────────────┐  ┌─────────────────────────────┐  │
//! │  │        handlers          │  │           routes            │  │
//! │  │ (tiles, providers, seed) │  │ (router config, CORS, base) │  │
//! │  └──────────────────────────┘  └─────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod handlers;
pub mod routes;

pub use handlers::{
    health_handler, providers_handler, seed_handler, tile_handler, AppState, ErrorResponse,
    HandlerError, HealthResponse, ProviderInfo, ProvidersResponse, SeedQueryParams, TileCoords,
    TILE_CACHE_HIT_HEADER,
};
pub use routes::{create_router, RouterConfig};
