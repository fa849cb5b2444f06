//! Tile resolution and disk cache engine.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              HTTP Handlers              │
//! └────────────────────┬────────────────────┘
//!                      │ (provider, z, x, y, format)
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │            ProviderRegistry             │
//! │   (name → Provider, explicit default)   │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │                Provider                 │
//! │  ┌──────────────┐  ┌─────────────────┐  │
//! │  │  DiskCache   │  │  TileFetcher    │  │
//! │  │ {dir}/{z}/   │  │  (upstream GET) │  │
//! │  │ {x}/{y}.ext  │  │                 │  │
//! │  └──────────────┘  └─────────────────┘  │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`Provider`]: read-through cache for one upstream source
//! - [`ProviderRegistry`]: named providers with a fixed default
//! - [`DiskCache`]: deterministic, append-only file layout
//! - [`Tile`]: coordinates plus immutable encoded bytes
//! - [`TileFormat`]: `png` or `jpg`
//! - [`format_url`], [`format_tile_dir_path`], [`format_tile_path`]: pure
//!   formatting helpers
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use osm_cache::tile::{Provider, ProviderConfig, TileFormat};
//! use osm_cache::upstream::{HttpFetcher, DEFAULT_UPSTREAM_TIMEOUT};
//!
//! #[tokio::main]
//! async fn main() {
//!     let fetcher = Arc::new(HttpFetcher::new(DEFAULT_UPSTREAM_TIMEOUT).unwrap());
//!     let provider = Provider::new(
//!         ProviderConfig::new(
//!             "osm",
//!             "https://tile.openstreetmap.org/{z}/{x}/{y}.png",
//!             "tiles/osm",
//!         ),
//!         fetcher,
//!     );
//!
//!     // First call downloads and stores tiles/osm/3/1/2.png, later calls read it
//!     let tile = provider.get_tile(1, 2, 3, TileFormat::Png).await.unwrap();
//!     println!("{} bytes", tile.bytes.len());
//! }
//! ```

mod disk;
mod format;
mod model;
mod path;
mod provider;
mod registry;
mod seed;

pub use disk::DiskCache;
pub use format::TileFormat;
pub use model::{validate_coords, QueryParam, Tile, TileKey, TileResponse, MAX_ZOOM};
pub use path::{format_tile_dir_path, format_tile_path, format_url};
pub use provider::{Provider, ProviderConfig};
pub use registry::ProviderRegistry;
pub use seed::{lat_lon_to_tile, BoundingBox, SeedReport, TileRange, MAX_LATITUDE, MAX_SEED_TILES};
