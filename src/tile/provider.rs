//! Upstream tile provider with a read-through disk cache.
//!
//! # Resolution pipeline
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Provider::lookup()                       │
//! │                                                                 │
//! │  1. {dir}/{z}/{x}/{y}.{ext} on disk? ──yes──► serve (no network)│
//! │                     │ no                                        │
//! │                     ▼                                           │
//! │  2. join or lead the in-flight fetch for this tile              │
//! │                     │                                           │
//! │                     ▼                                           │
//! │  3. GET upstream template ──404──► TileNotFound                 │
//! │                     │      ──err──► Upstream(..)                │
//! │                     ▼ 2xx                                       │
//! │  4. persist (best effort, failures only logged) ──► serve       │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use tokio::sync::watch;
use tracing::{debug, error, warn};

use crate::error::{FetchError, TileError};
use crate::upstream::TileFetcher;

use super::disk::DiskCache;
use super::format::TileFormat;
use super::model::{QueryParam, Tile, TileKey, TileResponse};
use super::path::format_url;

// =============================================================================
// Provider Configuration
// =============================================================================

/// Static description of an upstream tile source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Registry name, also the first path segment of named tile routes
    pub name: String,

    /// URL template with `{x}`, `{y}`, `{z}` and `{format}` placeholders
    pub url: String,

    /// Root of this provider's cache namespace
    pub dir: PathBuf,

    /// Attribution text shown by map clients
    pub attribution: Option<String>,
}

impl ProviderConfig {
    /// Create a provider description without attribution.
    pub fn new(name: impl Into<String>, url: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            dir: dir.into(),
            attribution: None,
        }
    }

    /// Set the attribution text.
    pub fn with_attribution(mut self, attribution: impl Into<String>) -> Self {
        self.attribution = Some(attribution.into());
        self
    }
}

// =============================================================================
// Provider
// =============================================================================

/// Result slot shared by every request coalesced onto one upstream fetch.
type InFlight = watch::Receiver<Option<Result<Bytes, TileError>>>;

/// An upstream tile source plus its dedicated disk cache.
///
/// Concurrent misses for the same tile share a single upstream request and a
/// single write. If the request leading a fetch is dropped (for instance
/// because the client disconnected), one of the waiting requests takes over.
pub struct Provider<F: TileFetcher> {
    name: String,
    url: String,
    attribution: Option<String>,
    cache: DiskCache,
    fetcher: Arc<F>,
    in_flight: Mutex<HashMap<TileKey, InFlight>>,
}

impl<F: TileFetcher> Provider<F> {
    /// Create a provider that fetches through `fetcher`.
    pub fn new(config: ProviderConfig, fetcher: Arc<F>) -> Self {
        Self {
            name: config.name,
            url: config.url,
            attribution: config.attribution,
            cache: DiskCache::new(config.dir),
            fetcher,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Registry name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// URL template.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Cache directory.
    pub fn dir(&self) -> &Path {
        self.cache.dir()
    }

    /// Attribution text, if any.
    pub fn attribution(&self) -> Option<&str> {
        self.attribution.as_deref()
    }

    /// The disk cache backing this provider.
    pub fn cache(&self) -> &DiskCache {
        &self.cache
    }

    /// Get a tile, from disk when cached, otherwise from upstream.
    ///
    /// A freshly fetched tile is written to disk before it is returned. A
    /// failed write is logged and does not fail the call.
    ///
    /// # Errors
    ///
    /// - [`TileError::TileNotFound`] if upstream answered 404
    /// - [`TileError::Upstream`] for any other upstream failure
    pub async fn get_tile(
        &self,
        x: u32,
        y: u32,
        z: u8,
        format: TileFormat,
    ) -> Result<Tile, TileError> {
        self.lookup(x, y, z, format, &[])
            .await
            .map(|response| response.tile)
    }

    /// Like [`get_tile`](Self::get_tile), forwarding extra query parameters
    /// to upstream on a miss.
    pub async fn get_tile_with_params(
        &self,
        x: u32,
        y: u32,
        z: u8,
        format: TileFormat,
        params: &[QueryParam],
    ) -> Result<Tile, TileError> {
        self.lookup(x, y, z, format, params)
            .await
            .map(|response| response.tile)
    }

    /// Resolve a tile and report whether it was a cache hit.
    pub async fn lookup(
        &self,
        x: u32,
        y: u32,
        z: u8,
        format: TileFormat,
        params: &[QueryParam],
    ) -> Result<TileResponse, TileError> {
        let key = TileKey::new(x, y, z, format);

        if let Some(bytes) = self.cache.read(&key).await {
            debug!(provider = %self.name, z, x, y, format = %format, "Tile served from disk");
            return Ok(TileResponse {
                tile: Tile::new(x, y, z, format, bytes),
                cache_hit: true,
            });
        }

        let bytes = if params.is_empty() {
            self.fetch_coalesced(key).await?
        } else {
            self.fetch_and_store(&key, params).await?
        };

        Ok(TileResponse {
            tile: Tile::new(x, y, z, format, bytes),
            cache_hit: false,
        })
    }

    /// Fetch a missing tile, sharing the work with concurrent identical misses.
    async fn fetch_coalesced(&self, key: TileKey) -> Result<Bytes, TileError> {
        loop {
            let (tx, rx) = watch::channel(None);

            let existing = {
                let mut in_flight = lock(&self.in_flight);
                match in_flight.get(&key) {
                    Some(waiter) => Some(waiter.clone()),
                    None => {
                        in_flight.insert(key, rx.clone());
                        None
                    }
                }
            };

            let Some(mut waiter) = existing else {
                // We lead this fetch. The guard frees the slot even if this
                // future is dropped before completing.
                let _guard = InFlightGuard {
                    in_flight: &self.in_flight,
                    key,
                    rx,
                };
                let result = self.fetch_and_store(&key, &[]).await;
                tx.send_replace(Some(result.clone()));
                return result;
            };

            let outcome = match waiter.wait_for(Option::is_some).await {
                Ok(value) => (*value).clone(),
                // Leader went away without a result; try again
                Err(_) => None,
            };

            if let Some(result) = outcome {
                return result;
            }
        }
    }

    /// Fetch from upstream and persist, without coalescing.
    async fn fetch_and_store(&self, key: &TileKey, params: &[QueryParam]) -> Result<Bytes, TileError> {
        let bytes = self.download(key, params).await?;

        if let Err(e) = self.cache.save(key, &bytes).await {
            warn!(
                provider = %self.name,
                z = key.z,
                x = key.x,
                y = key.y,
                error = %e,
                "Cannot save tile to disk"
            );
        }

        Ok(bytes)
    }

    /// Fetch a tile from upstream without touching the disk cache.
    pub(crate) async fn download(
        &self,
        key: &TileKey,
        params: &[QueryParam],
    ) -> Result<Bytes, TileError> {
        let url = format_url(&self.url, key.x, key.y, key.z, key.format);

        match self.fetcher.fetch(&url, params).await {
            Ok(bytes) => {
                debug!(provider = %self.name, url = %url, size = bytes.len(), "Tile downloaded");
                Ok(bytes)
            }
            Err(FetchError::NotFound) => {
                debug!(provider = %self.name, url = %url, "Tile not found upstream");
                Err(TileError::TileNotFound {
                    z: key.z,
                    x: key.x,
                    y: key.y,
                })
            }
            Err(e) => {
                error!(provider = %self.name, url = %url, error = %e, "Cannot get tile from provider");
                Err(TileError::Upstream(e))
            }
        }
    }
}

/// Removes an in-flight entry when its leader finishes or is dropped.
struct InFlightGuard<'a> {
    in_flight: &'a Mutex<HashMap<TileKey, InFlight>>,
    key: TileKey,
    rx: InFlight,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut in_flight = lock(self.in_flight);
        if in_flight
            .get(&self.key)
            .is_some_and(|current| current.same_channel(&self.rx))
        {
            in_flight.remove(&self.key);
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// Tests
// =============================================================================
