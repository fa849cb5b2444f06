use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode};
use tracing::debug;
use url::Url;

use crate::error::FetchError;
use crate::tile::QueryParam;

use super::TileFetcher;

/// Default timeout for a single upstream request.
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

/// User-Agent sent with every upstream request.
///
/// Public tile servers (openstreetmap.org in particular) reject requests
/// without an identifying agent.
pub fn user_agent() -> String {
    format!(
        "osm-cache/{} ({})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS
    )
}

/// `reqwest`-backed implementation of [`TileFetcher`].
///
/// Holds one connection-pooled client; cloning is cheap and shares the pool.
/// No retry is performed.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Create a fetcher with the given request timeout.
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(user_agent())
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        Ok(Self { client })
    }

    /// Wrap an already configured client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

/// Append the extra query parameters to `url`.
///
/// Without parameters the URL is parsed but otherwise left as templated.
fn build_url(url: &str, params: &[QueryParam]) -> Result<Url, FetchError> {
    let mut parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
        url: url.to_string(),
        message: e.to_string(),
    })?;

    if params.iter().any(|p| !p.values.is_empty()) {
        let mut query = parsed.query_pairs_mut();
        for param in params {
            for value in &param.values {
                query.append_pair(&param.name, value);
            }
        }
    }

    Ok(parsed)
}

#[async_trait]
impl TileFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, params: &[QueryParam]) -> Result<Bytes, FetchError> {
        let url = build_url(url, params)?;

        debug!(url = %url, "Fetching tile from upstream");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .bytes()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))
    }
}
