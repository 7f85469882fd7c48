//! Registry lookup of service capabilities
//!
//! The CADC registry publishes a plaintext feed mapping service identifiers
//! to the URL of their capabilities document:
//!
//! ```text
//! # comment
//! ivo://cadc.nrc.ca/tap = https://ws.cadc-ccda.hia-iha.nrc-cnrc.gc.ca/argus/capabilities
//! ```
//!
//! [`RegistryCache`] fetches that feed once and keeps it for its own
//! lifetime. [`CapabilityResolver`] combines the cache with a capabilities
//! document fetch to turn `(service, capability)` into an access URL.

use crate::capabilities::{parse_capabilities, select_access_url};
use crate::error::{Error, Result, check_status};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

/// Authority prefix used to expand CADC short service names
pub const CADC_AUTHORITY: &str = "ivo://cadc.nrc.ca/";

/// Service identifier to capabilities URL mapping, populated once.
///
/// Construct one per process (or per test) and share it through an `Arc`.
/// Entries are never invalidated.
#[derive(Debug)]
pub struct RegistryCache {
    registry_url: String,
    entries: OnceCell<HashMap<String, String>>,
}

impl RegistryCache {
    /// Create an empty cache backed by the registry feed at `registry_url`
    pub fn new(registry_url: impl Into<String>) -> Self {
        Self {
            registry_url: registry_url.into(),
            entries: OnceCell::new(),
        }
    }

    /// Create a cache that is already populated, never touching the network
    pub fn with_entries(registry_url: impl Into<String>, entries: HashMap<String, String>) -> Self {
        Self {
            registry_url: registry_url.into(),
            entries: OnceCell::new_with(Some(entries)),
        }
    }

    /// The registry feed URL
    pub fn registry_url(&self) -> &str {
        &self.registry_url
    }

    /// True once the registry feed has been loaded
    pub fn is_populated(&self) -> bool {
        self.entries.initialized()
    }

    /// Look up the capabilities URL of `service`, loading the feed on first use.
    ///
    /// `service` is an `ivo://` URI or a CADC short name such as `tap`.
    pub async fn capabilities_url(&self, http: &reqwest::Client, service: &str) -> Result<String> {
        let entries = self
            .entries
            .get_or_try_init(|| self.fetch(http))
            .await?;

        let service_uri = expand_service_uri(service);
        entries
            .get(&service_uri)
            .cloned()
            .ok_or_else(|| Error::UnknownService(service.to_string()))
    }

    async fn fetch(&self, http: &reqwest::Client) -> Result<HashMap<String, String>> {
        debug!(url = %self.registry_url, "loading CADC registry");

        let response = http.get(&self.registry_url).send().await.map_err(|e| {
            debug!(error = %e, "ERROR getting the CADC registry");
            Error::Network(e)
        })?;
        let response = check_status(response).inspect_err(|e| {
            debug!(error = %e, "ERROR getting the CADC registry");
        })?;
        let text = response.text().await?;

        let entries = parse_registry(&text);
        debug!(services = entries.len(), "CADC registry loaded");
        Ok(entries)
    }
}

/// Parse the registry feed: `key = value` lines, `#` comments and blank lines skipped
pub fn parse_registry(text: &str) -> HashMap<String, String> {
    text.lines()
        .filter(|line| !line.trim().is_empty() && !line.starts_with('#'))
        .filter_map(|line| match line.split_once('=') {
            Some((key, value)) => Some((key.trim().to_string(), value.trim().to_string())),
            None => {
                warn!(line, "skipping malformed registry line");
                None
            }
        })
        .collect()
}

/// Expand a CADC short name to a full `ivo://` URI; full URIs pass through
pub fn expand_service_uri(service: &str) -> String {
    if service.starts_with("ivo") {
        service.to_string()
    } else {
        format!("{}{}", CADC_AUTHORITY, service)
    }
}

/// Resolves `(service, capability)` pairs to access URLs
#[derive(Clone, Debug)]
pub struct CapabilityResolver {
    http: reqwest::Client,
    cache: Arc<RegistryCache>,
}

impl CapabilityResolver {
    /// Create a resolver using `http` for requests and `cache` for registry lookups
    pub fn new(http: reqwest::Client, cache: Arc<RegistryCache>) -> Self {
        Self { http, cache }
    }

    /// The registry cache backing this resolver
    pub fn cache(&self) -> &Arc<RegistryCache> {
        &self.cache
    }

    /// Resolve a service and optional capability to a URL.
    ///
    /// - `service` starting with `http` is taken as the capabilities URL itself
    ///   and returned unchanged when `capability` is `None`.
    /// - Otherwise the registry gives the capabilities URL, returned as-is when
    ///   `capability` is `None`.
    /// - With a capability, the capabilities document is fetched and the
    ///   access URL selected by [`select_access_url`].
    pub async fn resolve(&self, service: &str, capability: Option<&str>) -> Result<String> {
        let caps_url = if service.starts_with("http") {
            service.to_string()
        } else {
            self.cache.capabilities_url(&self.http, service).await?
        };

        let Some(capability) = capability else {
            return Ok(caps_url);
        };

        let response = self.http.get(&caps_url).send().await.map_err(|e| {
            debug!(error = %e, url = %caps_url, "ERROR getting the service capabilities");
            Error::Network(e)
        })?;
        let response = check_status(response).inspect_err(|e| {
            debug!(error = %e, "ERROR getting the service capabilities");
        })?;
        let document = response.text().await?;

        let capabilities = parse_capabilities(&document)?;
        let url = select_access_url(&capabilities, capability)?;
        debug!(service, capability, url = %url, "resolved capability");
        Ok(url)
    }
}
