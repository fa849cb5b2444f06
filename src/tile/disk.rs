//! On-disk tile cache.
//!
//! Every provider owns one [`DiskCache`] rooted at its cache directory. A tile
//! lives at `{dir}/{z}/{x}/{y}.{ext}`; the existence of that file is the only
//! cache-hit signal. There is no index, no expiry and no eviction.
//!
//! Writes go to a uniquely named temporary file in the destination directory
//! and are then renamed into place, so a reader never observes a partially
//! written tile.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use tokio::fs;
use tracing::{debug, warn};

use crate::error::PersistError;

use super::model::TileKey;
use super::path::{format_tile_dir_path, format_tile_path};

/// Disambiguates temporary files written concurrently by this process.
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Persistent, append-only tile store for one provider.
#[derive(Debug, Clone)]
pub struct DiskCache {
    dir: PathBuf,
}

impl DiskCache {
    /// Create a cache rooted at `dir`. Nothing is touched on disk until the
    /// first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Root directory of this cache namespace.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Deterministic file path of a tile.
    pub fn tile_path(&self, key: &TileKey) -> PathBuf {
        format_tile_path(&self.dir, key.z, key.x, key.y, key.format)
    }

    /// Read a cached tile.
    ///
    /// Returns `None` when the file is absent. Any other read error is logged
    /// and also reported as a miss, so the caller falls back to upstream.
    pub async fn read(&self, key: &TileKey) -> Option<Bytes> {
        let path = self.tile_path(key);

        match fs::read(&path).await {
            Ok(data) => Some(Bytes::from(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                debug!(path = ?path, error = %e, "Unreadable cache entry, treating as miss");
                None
            }
        }
    }

    /// Whether a tile is already cached.
    pub async fn contains(&self, key: &TileKey) -> bool {
        fs::try_exists(self.tile_path(key)).await.unwrap_or(false)
    }

    /// Persist a tile, creating intermediate directories as needed.
    ///
    /// If the destination already exists this is a no-op: entries are
    /// immutable once written. Returns the tile's path.
    pub async fn save(&self, key: &TileKey, data: &[u8]) -> Result<PathBuf, PersistError> {
        let dir = format_tile_dir_path(&self.dir, key.z, key.x);

        fs::create_dir_all(&dir)
            .await
            .map_err(|e| PersistError::CreateDir {
                path: dir.clone(),
                message: e.to_string(),
            })?;

        let path = self.tile_path(key);

        if fs::try_exists(&path).await.unwrap_or(false) {
            debug!(path = ?path, "Tile already cached, skipping write");
            return Ok(path);
        }

        let temp_path = dir.join(format!(
            ".{}.{}.{}-{}.tmp",
            key.y,
            key.format.extension(),
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));

        if let Err(e) = fs::write(&temp_path, data).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(PersistError::Write {
                path,
                message: e.to_string(),
            });
        }

        if let Err(e) = fs::rename(&temp_path, &path).await {
            let _ = fs::remove_file(&temp_path).await;

            // Lost a race with another writer of the same tile
            if fs::try_exists(&path).await.unwrap_or(false) {
                return Ok(path);
            }

            warn!(from = ?temp_path, to = ?path, error = %e, "Failed to move tile into place");
            return Err(PersistError::Write {
                path,
                message: e.to_string(),
            });
        }

        debug!(path = ?path, size = data.len(), "Tile written to disk");

        Ok(path)
    }
}
