//! Configuration types for cadc-tap

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Public CADC registry listing service identifiers and their capabilities URLs
pub const DEFAULT_REGISTRY_URL: &str =
    "https://www.cadc-ccda.hia-iha.nrc-cnrc.gc.ca/reg/resource-caps";

/// Registry identifier of the CADC TAP service
pub const DEFAULT_TAP_SERVICE_URI: &str = "ivo://cadc.nrc.ca/tap";

/// Registry identifier of the CADC DataLink service
pub const DEFAULT_DATALINK_SERVICE_URI: &str = "ivo://cadc.nrc.ca/caom2ops";

/// Main configuration for [`CadcClient`](crate::CadcClient)
///
/// Every field has a default pointing at the public CADC services, so
/// `Config::default()` is usable as-is. The `tap_url` and `datalink_url`
/// overrides bypass registry resolution for their endpoint.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Registry feed URL (`key = value` lines mapping service ids to capabilities URLs)
    #[serde(default = "default_registry_url")]
    pub registry_url: String,

    /// TAP service identifier (`ivo://` URI, CADC short name, or capabilities URL)
    #[serde(default = "default_tap_service_uri")]
    pub tap_service_uri: String,

    /// DataLink service identifier (`ivo://` URI, CADC short name, or capabilities URL)
    #[serde(default = "default_datalink_service_uri")]
    pub datalink_service_uri: String,

    /// TAP base URL to use instead of registry resolution
    #[serde(default)]
    pub tap_url: Option<String>,

    /// DataLink links endpoint to use instead of registry resolution
    #[serde(default)]
    pub datalink_url: Option<String>,

    /// HTTP request timeout (default: 30 seconds)
    #[serde(default = "default_timeout", with = "duration_serde")]
    pub timeout: Duration,

    /// Interval between phase checks in [`AsyncJob::wait`](crate::tap::AsyncJob::wait) (default: 2 seconds).
    /// Serialized as whole seconds.
    #[serde(default = "default_job_poll_interval", with = "duration_serde")]
    pub job_poll_interval: Duration,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            registry_url: default_registry_url(),
            tap_service_uri: default_tap_service_uri(),
            datalink_service_uri: default_datalink_service_uri(),
            tap_url: None,
            datalink_url: None,
            timeout: default_timeout(),
            job_poll_interval: default_job_poll_interval(),
            user_agent: default_user_agent(),
        }
    }
}

impl Config {
    /// Check that the configuration can produce a working client
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("registry_url", &self.registry_url),
            ("tap_service_uri", &self.tap_service_uri),
            ("datalink_service_uri", &self.datalink_service_uri),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(Error::Config {
                    message: format!("{} must not be empty", key),
                    key: Some(key.to_string()),
                });
            }
        }

        for (key, value) in [("timeout", self.timeout), ("job_poll_interval", self.job_poll_interval)] {
            if value.is_zero() {
                return Err(Error::Config {
                    message: format!("{} must be greater than zero", key),
                    key: Some(key.to_string()),
                });
            }
        }

        for (key, value) in [("tap_url", &self.tap_url), ("datalink_url", &self.datalink_url)] {
            if let Some(url) = value
                && url::Url::parse(url).is_err()
            {
                return Err(Error::Config {
                    message: format!("{} is not a valid URL: {}", key, url),
                    key: Some(key.to_string()),
                });
            }
        }

        Ok(())
    }

    /// Build the shared HTTP client for this configuration
    pub(crate) fn http_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(self.user_agent.as_str())
            .build()
            .map_err(Error::Network)
    }
}

fn default_registry_url() -> String {
    DEFAULT_REGISTRY_URL.to_string()
}

fn default_tap_service_uri() -> String {
    DEFAULT_TAP_SERVICE_URI.to_string()
}

fn default_datalink_service_uri() -> String {
    DEFAULT_DATALINK_SERVICE_URI.to_string()
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_job_poll_interval() -> Duration {
    Duration::from_secs(2)
}

fn default_user_agent() -> String {
    format!("cadc-tap/{}", env!("CARGO_PKG_VERSION"))
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
