//! High-level CADC client split into focused submodules.
//!
//! The `CadcClient` struct and its methods are organized by domain:
//! - [`queries`] - ADQL searches, collections, sync and async TAP execution
//! - [`data`] - DataLink resolution and image retrieval
//!
//! Endpoints are resolved lazily through the registry the first time they
//! are needed and memoised for the lifetime of the client (and its clones).

mod data;
mod queries;

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use queries::CollectionInfo;

use crate::capabilities::DATALINK_LINKS_CAPABILITY;
use crate::config::Config;
use crate::datalink::DataLinkResolver;
use crate::error::{Error, Result};
use crate::registry::{CapabilityResolver, RegistryCache};
use crate::retrieval::FileRetriever;
use crate::tap::TapService;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

/// Client for the CADC TAP and DataLink services (cloneable - shared state is Arc-wrapped)
#[derive(Clone, Debug)]
pub struct CadcClient {
    /// Configuration (wrapped in Arc for sharing across clones)
    pub(crate) config: Arc<Config>,
    /// HTTP client shared by every request
    pub(crate) http: reqwest::Client,
    /// Registry-backed capability resolution
    pub(crate) resolver: CapabilityResolver,
    /// File download helper
    pub(crate) retriever: FileRetriever,
    /// TAP service, resolved on first use
    tap: Arc<OnceCell<TapService>>,
    /// DataLink endpoint, resolved on first use
    datalink: Arc<OnceCell<DataLinkResolver>>,
}

impl CadcClient {
    /// Create a client with its own registry cache
    pub fn new(config: Config) -> Result<Self> {
        let cache = Arc::new(RegistryCache::new(config.registry_url.clone()));
        Self::with_registry(config, cache)
    }

    /// Create a client sharing an existing registry cache
    pub fn with_registry(config: Config, cache: Arc<RegistryCache>) -> Result<Self> {
        config.validate()?;
        let http = config.http_client()?;

        Ok(Self {
            resolver: CapabilityResolver::new(http.clone(), cache),
            retriever: FileRetriever::new(http.clone()),
            http,
            config: Arc::new(config),
            tap: Arc::new(OnceCell::new()),
            datalink: Arc::new(OnceCell::new()),
        })
    }

    /// Client configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Registry cache used for endpoint resolution
    pub fn registry(&self) -> &Arc<RegistryCache> {
        self.resolver.cache()
    }

    /// The TAP service, resolving its base URL on first call
    pub async fn tap(&self) -> Result<&TapService> {
        self.tap
            .get_or_try_init(|| async {
                let base_url = match &self.config.tap_url {
                    Some(url) => url.clone(),
                    None => {
                        let caps = self
                            .resolver
                            .resolve(&self.config.tap_service_uri, None)
                            .await?;
                        tap_base_from_capabilities(&caps)
                    }
                };
                info!(url = %base_url, "using TAP service");
                Ok::<_, Error>(TapService::new(
                    self.http.clone(),
                    base_url,
                    self.config.job_poll_interval,
                ))
            })
            .await
    }

    /// The DataLink resolver, resolving the `links` endpoint on first call
    pub async fn datalink(&self) -> Result<&DataLinkResolver> {
        self.datalink
            .get_or_try_init(|| async {
                let links_url = match &self.config.datalink_url {
                    Some(url) => url.clone(),
                    None => {
                        self.resolver
                            .resolve(
                                &self.config.datalink_service_uri,
                                Some(DATALINK_LINKS_CAPABILITY),
                            )
                            .await?
                    }
                };
                info!(url = %links_url, "using DataLink service");
                Ok::<_, Error>(DataLinkResolver::new(self.http.clone(), links_url))
            })
            .await
    }
}

/// TAP base URL for a capabilities URL: the trailing `capabilities` segment removed
pub(crate) fn tap_base_from_capabilities(caps_url: &str) -> String {
    caps_url
        .strip_suffix("capabilities")
        .unwrap_or(caps_url)
        .trim_end_matches('/')
        .to_string()
}
