//! HTTP request handlers for the osm-cache tile API.
//!
//! # Endpoints
//!
//! - `GET /{z}/{x}/{y}.{format}` - Serve a tile from the default provider
//! - `GET /{provider}/{z}/{x}/{y}.{format}` - Serve a tile from a named provider
//! - `GET /providers` - List configured providers
//! - `POST /seed` - Prefetch every tile of a bounding box
//! - `GET /health` - Health check endpoint

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::error::{FetchError, TileError};
use crate::tile::{validate_coords, BoundingBox, ProviderRegistry, SeedReport, TileFormat};
use crate::upstream::TileFetcher;

/// Header reporting whether a tile came from the disk cache.
pub const TILE_CACHE_HIT_HEADER: &str = "x-tile-cache-hit";

// =============================================================================
// Application State
// =============================================================================

/// Shared application state containing the provider registry.
///
/// This is passed to all handlers via Axum's State extractor.
pub struct AppState<F: TileFetcher> {
    /// Named providers and the default one
    pub registry: Arc<ProviderRegistry<F>>,

    /// Cache-Control max-age in seconds
    pub cache_max_age: u32,
}

impl<F: TileFetcher> AppState<F> {
    /// Create a new application state with a one day max-age.
    pub fn new(registry: Arc<ProviderRegistry<F>>) -> Self {
        Self {
            registry,
            cache_max_age: 86400,
        }
    }

    /// Create a new application state with custom cache max-age.
    pub fn with_cache_max_age(registry: Arc<ProviderRegistry<F>>, cache_max_age: u32) -> Self {
        Self {
            registry,
            cache_max_age,
        }
    }
}

impl<F: TileFetcher> Clone for AppState<F> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            cache_max_age: self.cache_max_age,
        }
    }
}

// =============================================================================
// Request Parameters
// =============================================================================

/// Validated tile coordinates parsed from a request path.
///
/// Path segments arrive as strings so malformed values get a JSON error
/// instead of an extractor rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileCoords {
    pub z: u8,
    pub x: u32,
    pub y: u32,
    pub format: TileFormat,
}

impl TileCoords {
    /// Parse `z`, `x` and a `{y}.{format}` filename.
    pub fn parse(z: &str, x: &str, filename: &str) -> Result<Self, TileError> {
        let z: u8 = z
            .parse()
            .map_err(|_| TileError::invalid_input(format!("Invalid zoom level {}", z)))?;
        let x: u32 = x
            .parse()
            .map_err(|_| TileError::invalid_input(format!("Invalid x coordinate {}", x)))?;

        let (y, format) = filename.split_once('.').ok_or_else(|| {
            TileError::invalid_input(format!("Missing tile format in {}", filename))
        })?;
        let y: u32 = y
            .parse()
            .map_err(|_| TileError::invalid_input(format!("Invalid y coordinate {}", y)))?;
        let format: TileFormat = format.parse()?;

        validate_coords(x, y, z)?;

        Ok(Self { z, x, y, format })
    }
}

/// Query parameters for seed requests.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedQueryParams {
    /// Provider name (defaults to the default provider)
    #[serde(default)]
    pub provider: Option<String>,

    pub top_lat: f64,
    pub top_lon: f64,
    pub bottom_lat: f64,
    pub bottom_lon: f64,

    /// Zoom level to seed
    pub zoom: u8,

    /// Tile format (default: png)
    #[serde(default)]
    pub format: Option<String>,
}

impl SeedQueryParams {
    /// The bounding box described by the corner parameters.
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox {
            top_lat: self.top_lat,
            top_lon: self.top_lon,
            bottom_lat: self.bottom_lat,
            bottom_lon: self.bottom_lon,
        }
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "not_found", "invalid_input")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    /// Create a new error response.
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: None,
        }
    }

    /// Create a new error response with status code.
    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: Some(status.as_u16()),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}

/// One entry of the providers listing.
#[derive(Debug, Serialize)]
pub struct ProviderInfo {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribution: Option<String>,
}

/// Response from the providers endpoint.
#[derive(Debug, Serialize)]
pub struct ProvidersResponse {
    /// Provider used for requests without a provider segment
    pub default: String,

    /// All providers, sorted by name
    pub providers: Vec<ProviderInfo>,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Convert TileError to HTTP response.
///
/// Server errors are logged at ERROR level, 404s at DEBUG and other client
/// errors at WARN.
impl IntoResponse for TileError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            TileError::InvalidInput { .. } => (StatusCode::BAD_REQUEST, "invalid_input"),
            TileError::TooManyTiles { .. } => (StatusCode::BAD_REQUEST, "too_many_tiles"),
            TileError::TileNotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
            TileError::ProviderNotFound { .. } => (StatusCode::NOT_FOUND, "provider_not_found"),
            TileError::Upstream(FetchError::InvalidUrl { .. }) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "invalid_upstream_url")
            }
            TileError::Upstream(_) => (StatusCode::BAD_GATEWAY, "upstream_error"),
        };
        let message = self.to_string();

        if status.is_server_error() {
            error!(
                error_type = error_type,
                status = status.as_u16(),
                "Server error: {}",
                message
            );
        } else if status == StatusCode::NOT_FOUND {
            debug!(
                error_type = error_type,
                status = status.as_u16(),
                "Not found: {}",
                message
            );
        } else {
            warn!(
                error_type = error_type,
                status = status.as_u16(),
                "Client error: {}",
                message
            );
        }

        let error_response = ErrorResponse::with_status(error_type, message, status);
        (status, Json(error_response)).into_response()
    }
}

/// Wrapper for handler errors to implement IntoResponse.
pub struct HandlerError(pub TileError);

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        self.0.into_response()
    }
}

impl From<TileError> for HandlerError {
    fn from(err: TileError) -> Self {
        HandlerError(err)
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle tile requests.
///
/// # Endpoints
///
/// - `GET /{z}/{x}/{y}.{format}` - default provider
/// - `GET /{provider}/{z}/{x}/{y}.{format}` - named provider
///
/// Both shapes share one catch-all route; any other number of path
/// segments is a 404.
///
/// # Response
///
/// - `200 OK`: tile image
/// - `400 Bad Request`: malformed coordinates or unknown format
/// - `404 Not Found`: unknown provider, or upstream has no such tile
/// - `502 Bad Gateway`: upstream failure
///
/// # Headers
///
/// - `Content-Type: image/png` or `image/jpeg`
/// - `Content-Disposition: inline; filename="{y}.{format}"`
/// - `Cache-Control: public, max-age={cache_max_age}`
/// - `X-Tile-Cache-Hit: true|false`
pub async fn tile_handler<F: TileFetcher + 'static>(
    State(state): State<AppState<F>>,
    Path(tile_path): Path<String>,
) -> Result<Response, HandlerError> {
    let segments: Vec<&str> = tile_path.split('/').collect();

    match segments.as_slice() {
        [z, x, filename] => serve_tile(&state, None, z, x, filename).await,
        [provider, z, x, filename] => {
            serve_tile(&state, Some(*provider), z, x, filename).await
        }
        _ => {
            debug!(path = %tile_path, "No route for path");
            let status = StatusCode::NOT_FOUND;
            let body = ErrorResponse::with_status(
                "not_found",
                format!("No route for /{}", tile_path),
                status,
            );
            Ok((status, Json(body)).into_response())
        }
    }
}

async fn serve_tile<F: TileFetcher>(
    state: &AppState<F>,
    provider: Option<&str>,
    z: &str,
    x: &str,
    filename: &str,
) -> Result<Response, HandlerError> {
    let coords = TileCoords::parse(z, x, filename)?;
    let provider = state.registry.resolve(provider)?;

    // Inbound query strings are not forwarded so every cached file matches
    // what a plain request for the same coordinates would fetch.
    let response = provider
        .lookup(coords.x, coords.y, coords.z, coords.format, &[])
        .await?;
    let tile = response.tile;

    let headers = [
        (header::CONTENT_TYPE, tile.format.content_type().to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("inline; filename=\"{}\"", tile.file_name()),
        ),
        (
            header::CACHE_CONTROL,
            format!("public, max-age={}", state.cache_max_age),
        ),
        (
            HeaderName::from_static(TILE_CACHE_HIT_HEADER),
            response.cache_hit.to_string(),
        ),
    ];

    Ok((StatusCode::OK, headers, Body::from(tile.bytes)).into_response())
}

/// Handle provider listing requests.
///
/// # Endpoint
///
/// `GET /providers`
///
/// # Response
///
/// ```json
/// {
///   "default": "osm",
///   "providers": [{ "name": "osm", "attribution": "© OpenStreetMap contributors" }]
/// }
/// ```
pub async fn providers_handler<F: TileFetcher + 'static>(
    State(state): State<AppState<F>>,
) -> Json<ProvidersResponse> {
    let providers = state
        .registry
        .iter()
        .map(|provider| ProviderInfo {
            name: provider.name().to_string(),
            attribution: provider.attribution().map(str::to_string),
        })
        .collect();

    Json(ProvidersResponse {
        default: state.registry.default_provider().name().to_string(),
        providers,
    })
}

/// Handle seed requests.
///
/// # Endpoint
///
/// `POST /seed?topLat=..&topLon=..&bottomLat=..&bottomLon=..&zoom=..`
///
/// Optional `provider` and `format` (default `png`) parameters.
///
/// # Response
///
/// - `200 OK`: [`SeedReport`] JSON
/// - `400 Bad Request`: invalid coordinates or more than 250 tiles
/// - `404 Not Found`: unknown provider
pub async fn seed_handler<F: TileFetcher + 'static>(
    State(state): State<AppState<F>>,
    Query(query): Query<SeedQueryParams>,
) -> Result<Json<SeedReport>, HandlerError> {
    let format = match query.format.as_deref() {
        Some(format) => format.parse::<TileFormat>()?,
        None => TileFormat::default(),
    };
    let provider = state.registry.resolve(query.provider.as_deref())?;

    let report = provider
        .seed(&query.bounding_box(), query.zoom, format)
        .await?;

    Ok(Json(report))
}

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0"
/// }
/// ```
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// =============================================================================
// Tests
// =============================================================================
