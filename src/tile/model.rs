//! Tile value types.

use bytes::Bytes;

use crate::error::TileError;

use super::format::TileFormat;

/// Highest zoom level accepted by [`validate_coords`].
///
/// At zoom 30 a column index still fits comfortably in a `u32`.
pub const MAX_ZOOM: u8 = 30;

// =============================================================================
// Tile
// =============================================================================

/// A single encoded raster tile.
///
/// Built per request either from the bytes on disk or from an upstream
/// payload. The bytes are never modified after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    /// Column at this zoom level
    pub x: u32,

    /// Row at this zoom level
    pub y: u32,

    /// Zoom level
    pub z: u8,

    /// Image format the bytes were requested as
    pub format: TileFormat,

    /// Raw encoded image
    pub bytes: Bytes,
}

impl Tile {
    /// Create a tile from its coordinates and payload.
    pub fn new(x: u32, y: u32, z: u8, format: TileFormat, bytes: impl Into<Bytes>) -> Self {
        Self {
            x,
            y,
            z,
            format,
            bytes: bytes.into(),
        }
    }

    /// Key identifying this tile within a provider.
    pub fn key(&self) -> TileKey {
        TileKey::new(self.x, self.y, self.z, self.format)
    }

    /// File name used in `Content-Disposition`, e.g. `2.png`.
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.y, self.format.extension())
    }
}

/// A tile together with where it was served from.
#[derive(Debug, Clone)]
pub struct TileResponse {
    /// The tile
    pub tile: Tile,

    /// Whether the bytes came from the disk cache
    pub cache_hit: bool,
}

// =============================================================================
// Tile Key
// =============================================================================

/// Identity of a tile within one provider's cache namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileKey {
    pub x: u32,
    pub y: u32,
    pub z: u8,
    pub format: TileFormat,
}

impl TileKey {
    pub fn new(x: u32, y: u32, z: u8, format: TileFormat) -> Self {
        Self { x, y, z, format }
    }
}

// =============================================================================
// Query Parameters
// =============================================================================

/// An extra query parameter forwarded verbatim to the upstream provider.
///
/// A parameter may carry several values; each one is appended as its own
/// `name=value` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryParam {
    pub name: String,
    pub values: Vec<String>,
}

impl QueryParam {
    /// Create a single-valued parameter.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: vec![value.into()],
        }
    }

    /// Create a parameter with several values.
    pub fn with_values(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

// =============================================================================
// Validation
// =============================================================================

/// Check that `(x, y, z)` addresses a tile of the standard slippy-map grid.
///
/// The zoom must not exceed [`MAX_ZOOM`] and both `x` and `y` must be below
/// `2^z`.
pub fn validate_coords(x: u32, y: u32, z: u8) -> Result<(), TileError> {
    if z > MAX_ZOOM {
        return Err(TileError::invalid_input(format!(
            "Invalid zoom level {} (max {})",
            z, MAX_ZOOM
        )));
    }

    let size = 1u64 << z;
    if u64::from(x) >= size || u64::from(y) >= size {
        return Err(TileError::invalid_input(format!(
            "Coordinates {}/{} out of range at zoom {} (must be below {})",
            x, y, z, size
        )));
    }

    Ok(())
}
