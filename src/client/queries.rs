//! Query operations: region and name searches, collections, raw TAP execution

use super::CadcClient;
use crate::adql::{self, QueryPayload};
use crate::coords::{Coordinates, Radius};
use crate::error::Result;
use crate::tap::{AsyncJob, JobRef, QueryOptions};
use crate::votable::Table;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// A collection hosted at the CADC
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CollectionInfo {
    /// Human-readable description
    pub description: String,
    /// Energy bands with data in the collection, in result order
    pub bands: Vec<String>,
}

impl CadcClient {
    /// Observations intersecting a cone, optionally limited to one collection
    pub async fn query_region(
        &self,
        coordinates: &Coordinates,
        radius: Radius,
        collection: Option<&str>,
    ) -> Result<Table> {
        let payload = adql::region_query(coordinates, radius, collection);
        self.exec_sync(&payload.query, &QueryOptions::default())
            .await
    }

    /// The request [`query_region`](Self::query_region) would send, without sending it
    pub fn query_region_payload(
        &self,
        coordinates: &Coordinates,
        radius: Radius,
        collection: Option<&str>,
    ) -> QueryPayload {
        adql::region_query(coordinates, radius, collection)
    }

    /// Observations whose target name contains `name` (case-insensitive)
    pub async fn query_name(&self, name: &str) -> Result<Table> {
        self.exec_sync(&adql::name_query(name), &QueryOptions::default())
            .await
    }

    /// Every collection hosted at the CADC, keyed by name
    pub async fn get_collections(&self) -> Result<BTreeMap<String, CollectionInfo>> {
        let table = self
            .exec_sync(adql::collections_query(), &QueryOptions::default())
            .await?;

        let mut collections: BTreeMap<String, CollectionInfo> = BTreeMap::new();
        for row in table.rows() {
            let Some(name) = row.get("collection") else {
                continue;
            };
            let info = collections
                .entry(name.to_string())
                .or_insert_with(|| CollectionInfo {
                    description: format!("The {} collection at the CADC", name),
                    bands: Vec::new(),
                });
            if let Some(band) = row.get("energy_emBand") {
                info.bands.push(band.to_string());
            }
        }

        debug!(collections = collections.len(), "loaded CADC collections");
        Ok(collections)
    }

    /// Run an ADQL query synchronously
    pub async fn exec_sync(&self, query: &str, options: &QueryOptions) -> Result<Table> {
        self.tap().await?.search(query, options).await
    }

    /// Run an ADQL query synchronously and save the VOTable to `path`
    pub async fn exec_sync_to_file(
        &self,
        query: &str,
        options: &QueryOptions,
        path: &Path,
    ) -> Result<()> {
        self.tap()
            .await?
            .search_to_file(query, options, path)
            .await
    }

    /// Create an asynchronous job; the caller runs, waits on and deletes it
    pub async fn create_async(&self, query: &str, options: &QueryOptions) -> Result<AsyncJob> {
        self.tap().await?.submit_job(query, options).await
    }

    /// Reattach to an existing asynchronous job
    pub async fn load_async_job(&self, job_id: &str) -> Result<AsyncJob> {
        Ok(self.tap().await?.job(job_id))
    }

    /// The caller's asynchronous jobs
    pub async fn list_async_jobs(&self) -> Result<Vec<JobRef>> {
        self.tap().await?.list_jobs().await
    }
}
