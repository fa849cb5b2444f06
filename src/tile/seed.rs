//! Bulk prefetch of every tile inside a bounding box.
//!
//! Seeding converts a latitude/longitude rectangle to a tile range at one
//! zoom level and pulls each missing tile into the disk cache. It is capped
//! at [`MAX_SEED_TILES`] tiles per call to keep public upstreams happy.

use std::f64::consts::PI;
use std::ops::RangeInclusive;

use serde::Serialize;
use tracing::{info, warn};

use crate::error::TileError;
use crate::upstream::TileFetcher;

use super::format::TileFormat;
use super::model::{TileKey, MAX_ZOOM};
use super::provider::Provider;

/// Maximum number of tiles a single seed request may cover.
pub const MAX_SEED_TILES: u64 = 250;

/// Latitude limit of the Web-Mercator projection.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// A rectangle given by its top-left and bottom-right corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub top_lat: f64,
    pub top_lon: f64,
    pub bottom_lat: f64,
    pub bottom_lon: f64,
}

/// Inclusive tile ranges covering a bounding box at one zoom level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileRange {
    pub z: u8,
    pub x: RangeInclusive<u32>,
    pub y: RangeInclusive<u32>,
}

impl TileRange {
    /// Number of tiles in the range.
    pub fn count(&self) -> u64 {
        let width = u64::from(self.x.end() - self.x.start()) + 1;
        let height = u64::from(self.y.end() - self.y.start()) + 1;
        width * height
    }

    /// Iterate `(x, y)` pairs row by row.
    pub fn iter(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.y
            .clone()
            .flat_map(move |y| self.x.clone().map(move |x| (x, y)))
    }
}

/// Outcome of a seed run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SeedReport {
    /// Cache paths of newly written tiles
    pub written: Vec<String>,

    /// Tiles that were already cached
    pub skipped: usize,

    /// Tiles that could not be fetched or written
    pub failed: usize,
}

/// Convert a coordinate to the tile containing it at zoom `z`.
pub fn lat_lon_to_tile(lat: f64, lon: f64, z: u8) -> Result<(u32, u32), TileError> {
    if z > MAX_ZOOM {
        return Err(TileError::invalid_input(format!(
            "Invalid zoom level {} (max {})",
            z, MAX_ZOOM
        )));
    }
    if !lat.is_finite() || lat.abs() > MAX_LATITUDE {
        return Err(TileError::invalid_input(format!(
            "Latitude {} outside ±{}",
            lat, MAX_LATITUDE
        )));
    }
    if !lon.is_finite() || lon.abs() > 180.0 {
        return Err(TileError::invalid_input(format!(
            "Longitude {} outside ±180",
            lon
        )));
    }

    let n = f64::from(1u32 << z);
    let max_index = n - 1.0;
    let lat_rad = lat.to_radians();

    let x = ((lon + 180.0) / 360.0 * n).floor().clamp(0.0, max_index);
    let y = ((1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0 * n)
        .floor()
        .clamp(0.0, max_index);

    Ok((x as u32, y as u32))
}

impl BoundingBox {
    /// Tile range covering this box at zoom `z`.
    ///
    /// The corners may be given in either order.
    pub fn tile_range(&self, z: u8) -> Result<TileRange, TileError> {
        let (x1, y1) = lat_lon_to_tile(self.top_lat, self.top_lon, z)?;
        let (x2, y2) = lat_lon_to_tile(self.bottom_lat, self.bottom_lon, z)?;

        Ok(TileRange {
            z,
            x: x1.min(x2)..=x1.max(x2),
            y: y1.min(y2)..=y1.max(y2),
        })
    }
}

impl<F: TileFetcher> Provider<F> {
    /// Fetch and cache every missing tile of `bbox` at zoom `z`.
    ///
    /// Tiles already on disk are skipped. Individual fetch or write failures
    /// are logged and counted in the report; they do not abort the run.
    ///
    /// # Errors
    ///
    /// - [`TileError::InvalidInput`] for coordinates outside the projection
    /// - [`TileError::TooManyTiles`] if the box covers more than
    ///   [`MAX_SEED_TILES`] tiles
    pub async fn seed(
        &self,
        bbox: &BoundingBox,
        z: u8,
        format: TileFormat,
    ) -> Result<SeedReport, TileError> {
        let range = bbox.tile_range(z)?;
        let requested = range.count();

        if requested > MAX_SEED_TILES {
            return Err(TileError::TooManyTiles {
                requested,
                limit: MAX_SEED_TILES,
            });
        }

        let mut report = SeedReport::default();

        for (x, y) in range.iter() {
            let key = TileKey::new(x, y, z, format);

            if self.cache().contains(&key).await {
                report.skipped += 1;
                continue;
            }

            let bytes = match self.download(&key, &[]).await {
                Ok(bytes) => bytes,
                Err(_) => {
                    report.failed += 1;
                    continue;
                }
            };

            match self.cache().save(&key, &bytes).await {
                Ok(path) => report.written.push(path.display().to_string()),
                Err(e) => {
                    warn!(provider = %self.name(), z, x, y, error = %e, "Cannot save seeded tile");
                    report.failed += 1;
                }
            }
        }

        info!(
            provider = %self.name(),
            z,
            written = report.written.len(),
            skipped = report.skipped,
            failed = report.failed,
            "Seed complete"
        );

        Ok(report)
    }
}
