//! URL and cache path formatting.
//!
//! Pure functions of their inputs. Paths are built with [`Path::join`] so the
//! platform separator is always correct.

use std::path::{Path, PathBuf};

use super::format::TileFormat;

/// Substitute `{x}`, `{y}`, `{z}` and `{format}` in a provider URL template.
///
/// Any other placeholder is left untouched.
pub fn format_url(template: &str, x: u32, y: u32, z: u8, format: TileFormat) -> String {
    template
        .replace("{x}", &x.to_string())
        .replace("{y}", &y.to_string())
        .replace("{z}", &z.to_string())
        .replace("{format}", format.extension())
}

/// Directory holding every row of column `x` at zoom `z`: `{dir}/{z}/{x}`.
pub fn format_tile_dir_path(dir: &Path, z: u8, x: u32) -> PathBuf {
    dir.join(z.to_string()).join(x.to_string())
}

/// Cache file for a tile: `{dir}/{z}/{x}/{y}.{format}`.
pub fn format_tile_path(dir: &Path, z: u8, x: u32, y: u32, format: TileFormat) -> PathBuf {
    format_tile_dir_path(dir, z, x).join(format!("{}.{}", y, format.extension()))
}
