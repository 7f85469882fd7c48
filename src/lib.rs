//! # cadc-tap
//!
//! Client library for the Canadian Astronomy Data Centre (CADC) Table Access
//! Protocol (TAP) and DataLink services.
//!
//! ## Overview
//!
//! cadc-tap:
//! - resolves service endpoints through the CADC registry and VOSI
//!   capabilities documents, fetching the registry at most once
//! - builds ADQL queries against the CAOM2 schema (cone searches, target
//!   names, collections) and runs them synchronously or as UWS jobs
//! - maps query results to cutout and data URLs through DataLink and
//!   retrieves the files
//!
//! Every operation issues its requests one after another; nothing retries.
//!
//! ## Quick Start
//!
//! ```no_run
//! use cadc_tap::{CadcClient, Config, Coordinates, Radius};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = CadcClient::new(Config::default())?;
//!
//!     let m31 = Coordinates::parse("00h42m44.3s +41d16m09s")?;
//!     let radius = Radius::from_arcmin(1.0)?;
//!
//!     let results = client.query_region(&m31, radius, Some("CFHT")).await?;
//!     println!("{} observations", results.len());
//!
//!     for url in client.get_image_list(&results, &m31, radius).await? {
//!         println!("{}", url);
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// ADQL query construction
pub mod adql;
/// VOSI capabilities documents
pub mod capabilities;
/// High-level client (decomposed into focused submodules)
pub mod client;
/// Configuration types
pub mod config;
/// Sky coordinates and search radii
pub mod coords;
/// DataLink resolution of cutout and data URLs
pub mod datalink;
/// Error types
pub mod error;
/// Registry lookup of service capabilities
pub mod registry;
/// Data file retrieval
pub mod retrieval;
/// Table Access Protocol client
pub mod tap;
/// VOTable parsing
pub mod votable;

// Re-export commonly used types
pub use adql::QueryPayload;
pub use client::{CadcClient, CollectionInfo};
pub use config::Config;
pub use coords::{Coordinates, Frame, Radius, SkyPosition};
pub use error::{Error, Result};
pub use registry::RegistryCache;
pub use retrieval::RetrievedFile;
pub use tap::{AsyncJob, JobPhase, QueryOptions, Upload};
pub use votable::{Row, Table, Value};
