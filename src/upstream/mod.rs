//! Upstream tile fetching.
//!
//! The [`TileFetcher`] trait is the seam between the cache engine and the
//! network. Production code uses [`HttpFetcher`]; tests substitute counting
//! or failing fetchers.

mod client;

pub use client::{user_agent, HttpFetcher, DEFAULT_UPSTREAM_TIMEOUT};

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::FetchError;
use crate::tile::QueryParam;

/// Fetches raw tile bytes from an upstream provider.
///
/// Implementations must be thread-safe: one fetcher is shared by every
/// provider and every in-flight request.
#[async_trait]
pub trait TileFetcher: Send + Sync {
    /// GET `url` with `params` appended to its query string.
    ///
    /// A 404 must be reported as [`FetchError::NotFound`], any other
    /// non-success status as [`FetchError::Status`] carrying the body text.
    async fn fetch(&self, url: &str, params: &[QueryParam]) -> Result<Bytes, FetchError>;
}
