//! Registry of named tile providers.
//!
//! The registry fixes its default provider when it is built, so requests
//! without a provider segment always resolve to the same source.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{ConfigError, TileError};
use crate::upstream::TileFetcher;

use super::provider::{Provider, ProviderConfig};

/// Named providers plus an explicit default.
pub struct ProviderRegistry<F: TileFetcher> {
    providers: BTreeMap<String, Arc<Provider<F>>>,
    default: Arc<Provider<F>>,
}

impl<F: TileFetcher> ProviderRegistry<F> {
    /// Build a registry from provider descriptions.
    ///
    /// `default` names the provider used when a request does not name one;
    /// `None` selects the first entry of `configs`.
    ///
    /// # Errors
    ///
    /// Fails if `configs` is empty, a name is repeated, two providers would
    /// share (or nest) a cache directory, or `default` is unknown.
    pub fn new(
        configs: Vec<ProviderConfig>,
        default: Option<&str>,
        fetcher: Arc<F>,
    ) -> Result<Self, ConfigError> {
        let first = configs.first().ok_or(ConfigError::NoProviders)?.name.clone();
        let default_name = default.map(str::to_string).unwrap_or(first);

        check_disjoint_dirs(&configs)?;

        let mut providers = BTreeMap::new();
        for config in configs {
            let name = config.name.clone();
            let provider = Arc::new(Provider::new(config, Arc::clone(&fetcher)));
            if providers.insert(name.clone(), provider).is_some() {
                return Err(ConfigError::DuplicateProvider(name));
            }
        }

        let default = providers
            .get(&default_name)
            .cloned()
            .ok_or(ConfigError::UnknownDefault(default_name))?;

        Ok(Self { providers, default })
    }

    /// Look up a provider by name.
    pub fn get(&self, name: &str) -> Option<&Arc<Provider<F>>> {
        self.providers.get(name)
    }

    /// Resolve an optional provider name.
    ///
    /// `None` yields the default provider; an unknown name is an error.
    pub fn resolve(&self, name: Option<&str>) -> Result<&Arc<Provider<F>>, TileError> {
        match name {
            None => Ok(&self.default),
            Some(name) => self.get(name).ok_or_else(|| TileError::ProviderNotFound {
                name: name.to_string(),
            }),
        }
    }

    /// The default provider.
    pub fn default_provider(&self) -> &Arc<Provider<F>> {
        &self.default
    }

    /// Provider names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.providers.keys().map(String::as_str).collect()
    }

    /// Iterate providers in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Provider<F>>> {
        self.providers.values()
    }

    /// Number of registered providers.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Always false for a successfully built registry.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

/// Reject providers whose cache directories are equal or nested.
fn check_disjoint_dirs(configs: &[ProviderConfig]) -> Result<(), ConfigError> {
    for (i, a) in configs.iter().enumerate() {
        for b in &configs[i + 1..] {
            if a.name == b.name {
                return Err(ConfigError::DuplicateProvider(a.name.clone()));
            }
            if a.dir.starts_with(&b.dir) || b.dir.starts_with(&a.dir) {
                return Err(ConfigError::SharedCacheDir {
                    first: a.name.clone(),
                    second: b.name.clone(),
                    path: a.dir.clone(),
                });
            }
        }
    }
    Ok(())
}
