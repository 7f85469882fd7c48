//! Error types for cadc-tap
//!
//! Errors fall into a few families:
//! - Usage errors (missing columns, bad coordinates) reported before any I/O
//! - Transport errors propagated unchanged from `reqwest`
//! - Protocol errors (unknown service, unusable capability, malformed documents)
//! - Service-reported query failures
//!
//! Nothing in this crate retries on error.

use thiserror::Error;

/// Result type alias for cadc-tap operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for cadc-tap
#[derive(Debug, Error)]
pub enum Error {
    /// Caller supplied unusable input (missing column, empty table, bad coordinates)
    #[error("usage error: {0}")]
    Usage(String),

    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "registry_url")
        key: Option<String>,
    },

    /// Network error from the HTTP transport
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// A service answered with a non-success HTTP status
    #[error("HTTP {status} from {url}")]
    Http {
        /// The HTTP status code returned
        status: u16,
        /// The URL that was requested
        url: String,
    },

    /// Service identifier is not listed in the registry
    #[error("cannot find the capabilities of service {0}")]
    UnknownService(String),

    /// No interface of the capability allows anonymous or cookie access
    #[error("capability {0} not found or not working with anonymous or cookie access")]
    CapabilityNotUsable(String),

    /// A service or configured URL could not be parsed
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Malformed XML document (capabilities, VOTable, UWS job)
    #[error("XML error: {0}")]
    Xml(String),

    /// The service reported a failed query or job
    #[error("query failed: {0}")]
    Query(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build a usage error from any message
    pub fn usage(message: impl Into<String>) -> Self {
        Error::Usage(message.into())
    }

    /// Returns true if the error was caused by the caller's input rather than the service
    pub fn is_usage(&self) -> bool {
        matches!(self, Error::Usage(_) | Error::Config { .. })
    }
}

impl From<quick_xml::Error> for Error {
    fn from(e: quick_xml::Error) -> Self {
        Error::Xml(e.to_string())
    }
}

/// Check an HTTP response status, turning failures into [`Error::Http`]
pub(crate) fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(Error::Http {
            status: status.as_u16(),
            url: response.url().to_string(),
        })
    }
}
