use std::path::PathBuf;

use thiserror::Error;

/// Errors returned by an upstream tile fetch.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Upstream answered 404 for the tile
    #[error("Tile not found upstream")]
    NotFound,

    /// Upstream answered with a non-success status; carries the response body
    #[error("Upstream returned {status}: {body}")]
    Status { status: u16, body: String },

    /// DNS, connection, TLS or timeout failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// The templated URL could not be parsed
    #[error("Invalid upstream URL {url}: {message}")]
    InvalidUrl { url: String, message: String },
}

/// Errors that can occur while writing a tile to the disk cache.
///
/// These never fail a tile request; the provider logs them and moves on.
#[derive(Debug, Clone, Error)]
pub enum PersistError {
    /// The `{dir}/{z}/{x}` directory could not be created
    #[error("Cannot create tile directory {path}: {message}", path = .path.display())]
    CreateDir { path: PathBuf, message: String },

    /// The tile file could not be written
    #[error("Cannot write tile file {path}: {message}", path = .path.display())]
    Write { path: PathBuf, message: String },
}

/// Errors that can occur when resolving a tile.
#[derive(Debug, Clone, Error)]
pub enum TileError {
    /// Malformed coordinates, unknown format token or bad bounding box
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    /// Upstream has no tile at these coordinates
    #[error("Tile not found: {z}/{x}/{y}")]
    TileNotFound { z: u8, x: u32, y: u32 },

    /// Any other upstream failure
    #[error("Cannot get tile from provider: {0}")]
    Upstream(FetchError),

    /// No provider registered under this name
    #[error("Provider not found: {name}")]
    ProviderNotFound { name: String },

    /// A seed request covers more tiles than allowed
    #[error("Cannot seed {requested} tiles (limit is {limit})")]
    TooManyTiles { requested: u64, limit: u64 },
}

impl TileError {
    /// Shorthand for an [`TileError::InvalidInput`] error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        TileError::InvalidInput {
            message: message.into(),
        }
    }
}

/// Errors raised while assembling the provider registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// At least one provider is required
    #[error("At least one tile provider is required")]
    NoProviders,

    /// Two providers registered under the same name
    #[error("Duplicate provider name: {0}")]
    DuplicateProvider(String),

    /// Two providers would write into the same cache namespace
    #[error("Providers '{first}' and '{second}' share the cache directory {path}", path = .path.display())]
    SharedCacheDir {
        first: String,
        second: String,
        path: PathBuf,
    },

    /// The default provider name does not match a registered provider
    #[error("Default provider '{0}' is not registered")]
    UnknownDefault(String),
}
