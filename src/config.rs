//! Configuration management for osm-cache.
//!
//! All options come from command-line arguments via clap, each with an
//! `OSM_`-prefixed environment variable fallback and a sensible default.
//!
//! # Environment Variables
//!
//! - `OSM_HOST` - Server bind address (default: 0.0.0.0)
//! - `OSM_PORT` - Server port (default: 8000)
//! - `OSM_BASE_PATH` - Path prefix for every route (default: /)
//! - `OSM_TILES_PATH` - Root of the tile cache (default: tiles)
//! - `OSM_PROVIDERS` - Comma-separated `name=url_template` list
//!   (default: `osm=https://tile.openstreetmap.org/{z}/{x}/{y}.png`)
//! - `OSM_DEFAULT_PROVIDER` - Provider used when a request names none
//! - `OSM_CACHE_ALLOWED_ORIGINS` - Comma-separated CORS origins
//!   (default: http://localhost:{port})
//! - `OSM_UPSTREAM_TIMEOUT` - Upstream request timeout in seconds (default: 30)
//! - `OSM_CACHE_MAX_AGE` - HTTP Cache-Control max-age in seconds (default: 86400)

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use clap::Parser;

use crate::tile::ProviderConfig;

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 8000;

/// Default route prefix.
pub const DEFAULT_BASE_PATH: &str = "/";

/// Default cache root.
pub const DEFAULT_TILES_PATH: &str = "tiles";

/// Default upstream timeout in seconds.
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 30;

/// Default HTTP cache max-age in seconds (1 day). Cached tiles never change.
pub const DEFAULT_CACHE_MAX_AGE: u32 = 86400;

/// Name of the built-in provider.
pub const OSM_PROVIDER_NAME: &str = "osm";

/// URL template of the built-in provider.
pub const OSM_PROVIDER_URL: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";

/// Attribution of the built-in provider.
pub const OSM_ATTRIBUTION: &str = "© OpenStreetMap contributors";

// =============================================================================
// Provider Argument
// =============================================================================

/// A provider given on the command line as `name=url_template`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderArg {
    pub name: String,
    pub url: String,
}

impl FromStr for ProviderArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, url) = s
            .split_once('=')
            .ok_or_else(|| format!("expected name=url_template, got '{}'", s))?;

        let name = name.trim();
        let url = url.trim();

        if name.is_empty() || url.is_empty() {
            return Err(format!("expected name=url_template, got '{}'", s));
        }

        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(format!(
                "provider name '{}' may only contain letters, digits, '-' and '_'",
                name
            ));
        }

        Ok(Self {
            name: name.to_string(),
            url: url.to_string(),
        })
    }
}

// =============================================================================
// CLI Arguments
// =============================================================================

/// osm-cache - A caching reverse proxy for map tiles.
///
/// Serves `/{z}/{x}/{y}.{format}` tiles, downloading each one from an upstream
/// provider on first request and serving it from disk afterwards.
#[derive(Parser, Debug, Clone)]
#[command(name = "osm-cache")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "OSM_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "OSM_PORT")]
    pub port: u16,

    /// Path prefix under which all routes are mounted (must start with '/').
    #[arg(long, default_value = DEFAULT_BASE_PATH, env = "OSM_BASE_PATH")]
    pub base_path: String,

    // =========================================================================
    // Cache Configuration
    // =========================================================================
    /// Root directory of the tile cache. Each provider gets `{tiles_path}/{name}`.
    #[arg(long, default_value = DEFAULT_TILES_PATH, env = "OSM_TILES_PATH")]
    pub tiles_path: PathBuf,

    /// HTTP Cache-Control max-age in seconds.
    #[arg(long, default_value_t = DEFAULT_CACHE_MAX_AGE, env = "OSM_CACHE_MAX_AGE")]
    pub cache_max_age: u32,

    // =========================================================================
    // Provider Configuration
    // =========================================================================
    /// Upstream provider as `name=url_template` (repeatable).
    ///
    /// The template may use `{x}`, `{y}`, `{z}` and `{format}`. Defaults to the
    /// OpenStreetMap tile server.
    #[arg(long = "provider", env = "OSM_PROVIDERS", value_delimiter = ',')]
    pub providers: Vec<ProviderArg>,

    /// Provider used for requests without a provider segment.
    ///
    /// Defaults to the first configured provider.
    #[arg(long, env = "OSM_DEFAULT_PROVIDER")]
    pub default_provider: Option<String>,

    /// Upstream request timeout in seconds.
    #[arg(long, default_value_t = DEFAULT_UPSTREAM_TIMEOUT_SECS, env = "OSM_UPSTREAM_TIMEOUT")]
    pub upstream_timeout: u64,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, only http://localhost:{port} is accepted.
    #[arg(long, env = "OSM_CACHE_ALLOWED_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl Config {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.port == 0 {
            return Err("port must be greater than 0".to_string());
        }

        if !self.base_path.starts_with('/') {
            return Err(format!(
                "base_path must start with '/', got '{}'",
                self.base_path
            ));
        }

        if self.upstream_timeout == 0 {
            return Err("upstream_timeout must be greater than 0".to_string());
        }

        if self.tiles_path.as_os_str().is_empty() {
            return Err("tiles_path must not be empty".to_string());
        }

        let args = self.provider_args();
        for (i, arg) in args.iter().enumerate() {
            if args[..i].iter().any(|other| other.name == arg.name) {
                return Err(format!("provider '{}' is configured twice", arg.name));
            }
        }

        if let Some(ref default) = self.default_provider {
            if !args.iter().any(|arg| &arg.name == default) {
                return Err(format!(
                    "default provider '{}' is not configured. Set --provider {}=<url>",
                    default, default
                ));
            }
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Base path without a trailing slash; `/` stays `/`.
    pub fn normalized_base_path(&self) -> String {
        let trimmed = self.base_path.trim_end_matches('/');
        if trimmed.is_empty() {
            "/".to_string()
        } else {
            trimmed.to_string()
        }
    }

    /// Upstream request timeout.
    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout)
    }

    /// CORS origins, falling back to the local origin of this server.
    pub fn allowed_origins(&self) -> Vec<String> {
        match &self.cors_origins {
            Some(origins) => origins.clone(),
            None => vec![self.local_origin()],
        }
    }

    /// `http://localhost:{port}`.
    pub fn local_origin(&self) -> String {
        format!("http://localhost:{}", self.port)
    }

    /// Configured providers, or the built-in OpenStreetMap provider.
    pub fn provider_args(&self) -> Vec<ProviderArg> {
        if self.providers.is_empty() {
            vec![ProviderArg {
                name: OSM_PROVIDER_NAME.to_string(),
                url: OSM_PROVIDER_URL.to_string(),
            }]
        } else {
            self.providers.clone()
        }
    }

    /// Provider descriptions with per-provider cache directories.
    pub fn provider_configs(&self) -> Vec<ProviderConfig> {
        self.provider_args()
            .into_iter()
            .map(|arg| {
                let dir = self.tiles_path.join(&arg.name);
                let config = ProviderConfig::new(arg.name, arg.url.clone(), dir);
                if arg.url == OSM_PROVIDER_URL {
                    config.with_attribution(OSM_ATTRIBUTION)
                } else {
                    config
                }
            })
            .collect()
    }
}

// =============================================================================
// Tests
// =============================================================================
