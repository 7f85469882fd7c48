//! DataLink resolution
//!
//! Maps publisher identifiers from a CAOM query result to downloadable URLs:
//! SODA cutout URLs around a position ([`DataLinkResolver::cutout_urls`]) or the
//! plain data URLs of each product ([`DataLinkResolver::data_urls`]).
//!
//! Cutout resolution batches identifiers [`DATALINK_BATCH_SIZE`] per request;
//! data URL resolution sends one request per identifier.

use crate::coords::{Coordinates, Radius};
use crate::error::{Error, Result, check_status};
use crate::votable::{Row, Table, VoTable, parse_votable};
use tracing::{debug, warn};

/// Publisher identifiers sent per cutout DataLink request
pub const DATALINK_BATCH_SIZE: usize = 20;

/// Column holding publisher identifiers in CAOM query results
pub const PUBLISHER_ID_COLUMN: &str = "publisherID";

/// Older name of [`PUBLISHER_ID_COLUMN`], still present in some result tables
pub const LEGACY_PUBLISHER_ID_COLUMN: &str = "caomPublisherID";

const CUTOUT_SEMANTICS: &str = "#cutout";
const THIS_SEMANTICS: &str = "#this";

// Input parameters copied from the service descriptor into a cutout URL
const FORWARDED_PARAMS: [&str; 2] = ["ID", "RUNID"];

/// Client for one DataLink `links` endpoint
#[derive(Clone, Debug)]
pub struct DataLinkResolver {
    http: reqwest::Client,
    links_url: String,
}

impl DataLinkResolver {
    /// Create a resolver for the `links` endpoint at `links_url`
    pub fn new(http: reqwest::Client, links_url: impl Into<String>) -> Self {
        Self {
            http,
            links_url: links_url.into(),
        }
    }

    /// The `links` endpoint URL
    pub fn links_url(&self) -> &str {
        &self.links_url
    }

    /// Fetch the links document for `ids` in a single request
    pub async fn links(&self, ids: &[&str]) -> Result<VoTable> {
        let url = url::Url::parse_with_params(&self.links_url, ids.iter().map(|id| ("ID", *id)))?;
        debug!(url = %url, ids = ids.len(), "requesting DataLink links");

        let response = check_status(self.http.get(url).send().await?)?;
        let bytes = response.bytes().await?;
        parse_votable(&bytes)?.into_result()
    }

    /// Cutout URLs of a circle around `coordinates` for every product in `table`
    pub async fn cutout_urls(
        &self,
        table: &Table,
        coordinates: &Coordinates,
        radius: Radius,
    ) -> Result<Vec<String>> {
        let ids = publisher_ids(table)?;
        let pos = circle(coordinates, radius);

        let mut urls = Vec::new();
        for batch in ids.chunks(DATALINK_BATCH_SIZE) {
            let links = self.links(batch).await?;
            urls.extend(cutout_links(&links, &pos));
        }

        debug!(products = ids.len(), urls = urls.len(), "resolved cutout URLs");
        Ok(urls)
    }

    /// Data URLs of every product in `table`, with auxiliary files (previews,
    /// thumbnails) when `include_auxiliaries` is set
    pub async fn data_urls(&self, table: &Table, include_auxiliaries: bool) -> Result<Vec<String>> {
        let ids = publisher_ids(table)?;

        let mut urls = Vec::new();
        for &id in &ids {
            let links = self.links(&[id]).await?;
            urls.extend(data_links(&links.table, include_auxiliaries));
        }

        debug!(products = ids.len(), urls = urls.len(), "resolved data URLs");
        Ok(urls)
    }
}

/// Publisher identifiers of `table`, in row order.
///
/// Fails with [`Error::Usage`] when the table is empty or has no publisher ID
/// column. Null cells are skipped.
pub fn publisher_ids(table: &Table) -> Result<Vec<&str>> {
    let column = publisher_id_column(table)?;

    let total = column.len();
    let ids: Vec<&str> = column.into_iter().flatten().collect();
    if ids.len() < total {
        warn!(
            skipped = total - ids.len(),
            "query result rows without a publisher ID were skipped"
        );
    }
    Ok(ids)
}

/// Checks that `table` can be resolved through DataLink, without logging
pub(crate) fn check_publisher_ids(table: &Table) -> Result<()> {
    publisher_id_column(table).map(|_| ())
}

fn publisher_id_column(table: &Table) -> Result<Vec<Option<&str>>> {
    if table.is_empty() {
        return Err(Error::usage("query result is empty"));
    }

    [PUBLISHER_ID_COLUMN, LEGACY_PUBLISHER_ID_COLUMN]
        .into_iter()
        .find_map(|name| table.column(name))
        .ok_or_else(|| {
            Error::usage(format!(
                "{} column missing from query result",
                PUBLISHER_ID_COLUMN
            ))
        })
}

/// The SODA `POS` value for a circle around `coordinates`
pub fn circle(coordinates: &Coordinates, radius: Radius) -> String {
    let position = coordinates.to_fk5();
    format!("CIRCLE {} {} {}", position.ra, position.dec, radius.degrees())
}

/// Synchronous cutout URLs advertised by a links document.
///
/// Every `#cutout` row whose service descriptor points at a `/sync` endpoint
/// yields one URL carrying the descriptor's `ID` and `RUNID` inputs plus `POS`.
pub fn cutout_links(links: &VoTable, pos: &str) -> Vec<String> {
    let mut urls = Vec::new();
    for row in links.table.rows() {
        if row.get("semantics") != Some(CUTOUT_SEMANTICS) {
            continue;
        }
        let Some(service) = row.get("service_def").and_then(|id| links.service(id)) else {
            debug!("cutout link without a service descriptor");
            continue;
        };
        let Some(access_url) = service.access_url() else {
            continue;
        };
        if !access_url.contains("/sync") {
            continue;
        }

        let mut query = url::form_urlencoded::Serializer::new(String::new());
        for param in &service.input_params {
            if !FORWARDED_PARAMS.contains(&param.name.as_str()) {
                continue;
            }
            let value = param
                .value
                .as_deref()
                .filter(|v| !v.is_empty())
                .or_else(|| param.reference.as_deref().and_then(|r| referenced(&row, r)));
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                query.append_pair(&param.name, value);
            }
        }
        query.append_pair("POS", pos);

        urls.push(format!("{}?{}", access_url, query.finish()));
    }
    urls
}

/// Data URLs listed in a links table.
///
/// `#this` rows are always included; other rows with an `access_url` only
/// when `include_auxiliaries` is set. A row with a null `access_url` has
/// nothing to download and is skipped.
pub fn data_links(links: &Table, include_auxiliaries: bool) -> Vec<String> {
    links
        .rows()
        .filter_map(|row| {
            let primary = row.get("semantics") == Some(THIS_SEMANTICS);
            if !primary && !include_auxiliaries {
                return None;
            }
            let access_url = row.get("access_url").filter(|u| !u.is_empty());
            if primary && access_url.is_none() {
                warn!(id = row.get("ID").unwrap_or_default(), "#this link without an access URL");
            }
            access_url.map(str::to_string)
        })
        .collect()
}

fn referenced<'a>(row: &Row<'a>, reference: &str) -> Option<&'a str> {
    row.get_by_id(reference).or_else(|| row.get(reference))
}
