//! ADQL query construction for the CAOM2 schema
//!
//! Everything here is pure string building; nothing touches the network.

use crate::coords::{Coordinates, Radius};

/// Result serialization requested from the TAP service
pub const VOTABLE_FORMAT: &str = "VOTable";

const OBSERVATION_PLANE_JOIN: &str =
    "SELECT * from caom2.Observation o join caom2.Plane p ON o.obsID=p.obsID";

const NOT_JUNK: &str = "(quality_flag IS NULL OR quality_flag != 'junk')";

/// A query ready to send to the TAP service
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryPayload {
    /// ADQL text
    pub query: String,
    /// Output format
    pub format: String,
}

impl QueryPayload {
    fn new(query: String) -> Self {
        Self {
            query,
            format: VOTABLE_FORMAT.to_string(),
        }
    }
}

/// Quote a string as an ADQL literal, doubling embedded single quotes
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Observations whose position bounds intersect the cone, excluding junk-quality planes.
///
/// The cone centre is normalized to FK5 before being embedded. A collection
/// filter is appended only for a non-empty `collection`.
pub fn region_query(
    coordinates: &Coordinates,
    radius: Radius,
    collection: Option<&str>,
) -> QueryPayload {
    let pos = coordinates.to_fk5();
    let mut query = format!(
        "{} WHERE INTERSECTS( CIRCLE('ICRS', {}, {}, {}), position_bounds) = 1 AND {}",
        OBSERVATION_PLANE_JOIN, pos.ra, pos.dec, radius, NOT_JUNK
    );

    if let Some(collection) = collection.filter(|c| !c.is_empty()) {
        query.push_str(&format!(" AND collection={}", quote_literal(collection)));
    }

    QueryPayload::new(query)
}

/// [`region_query`] restricted to image data products
pub fn image_query(
    coordinates: &Coordinates,
    radius: Radius,
    collection: Option<&str>,
) -> QueryPayload {
    let mut payload = region_query(coordinates, radius, collection);
    payload.query.push_str(" AND (dataProductType = 'image')");
    payload
}

/// Observations whose target name contains `name`, case-insensitively
pub fn name_query(name: &str) -> String {
    let pattern = format!("%{}%", name.to_lowercase());
    format!(
        "select * from caom2.Observation o join caom2.Plane p \
         on o.obsID=p.obsID where lower(target_name) like {}",
        quote_literal(&pattern)
    )
}

/// Every hosted collection with its energy bands
pub fn collections_query() -> &'static str {
    "select distinct collection, energy_emBand from caom2.EnumField"
}
