//! Data access: cutout and data URLs, image retrieval

use super::CadcClient;
use crate::adql::{self, QueryPayload};
use crate::coords::{Coordinates, Radius};
use crate::datalink::check_publisher_ids;
use crate::error::Result;
use crate::retrieval::RetrievedFile;
use crate::tap::QueryOptions;
use crate::votable::{SYNC_ROW_LIMIT, Table};
use tracing::{debug, info, warn};

impl CadcClient {
    /// Cutout URLs around `coordinates` for every product in `table`.
    ///
    /// `table` must come from a query selecting the `publisherID` column,
    /// such as [`query_region`](Self::query_region).
    pub async fn get_image_list(
        &self,
        table: &Table,
        coordinates: &Coordinates,
        radius: Radius,
    ) -> Result<Vec<String>> {
        // Reject unusable input before the DataLink endpoint is resolved
        check_publisher_ids(table)?;
        self.datalink()
            .await?
            .cutout_urls(table, coordinates, radius)
            .await
    }

    /// Data URLs for every product in `table`, optionally with auxiliary files
    pub async fn get_data_urls(
        &self,
        table: &Table,
        include_auxiliaries: bool,
    ) -> Result<Vec<String>> {
        check_publisher_ids(table)?;
        self.datalink()
            .await?
            .data_urls(table, include_auxiliaries)
            .await
    }

    /// The query [`get_images`](Self::get_images) would run, without running it
    pub fn get_images_payload(
        &self,
        coordinates: &Coordinates,
        radius: Radius,
        collection: Option<&str>,
    ) -> QueryPayload {
        adql::image_query(coordinates, radius, collection)
    }

    /// Cutouts of every image intersecting the cone.
    ///
    /// A file that cannot be retrieved is logged and skipped; the others are
    /// still returned.
    pub async fn get_images(
        &self,
        coordinates: &Coordinates,
        radius: Radius,
        collection: Option<&str>,
    ) -> Result<Vec<RetrievedFile>> {
        let payload = adql::image_query(coordinates, radius, collection);
        let table = self
            .exec_sync(&payload.query, &QueryOptions::default())
            .await?;

        if table.is_possibly_truncated() {
            debug!(
                limit = SYNC_ROW_LIMIT,
                "synchronous query results capped, results may be truncated"
            );
        }
        if table.is_empty() {
            info!("no images found");
            return Ok(Vec::new());
        }

        let urls = self.get_image_list(&table, coordinates, radius).await?;

        let mut images = Vec::with_capacity(urls.len());
        for url in &urls {
            match self.retriever.fetch(url).await {
                Ok(file) => images.push(file),
                Err(e) => warn!(url = %url, error = %e, "failed to retrieve image, skipping"),
            }
        }

        info!(
            retrieved = images.len(),
            requested = urls.len(),
            "retrieved images"
        );
        Ok(images)
    }
}
