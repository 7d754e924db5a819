//! CSV decoding for ERDDAP responses.
//!
//! Two shapes are handled:
//! - the `allDatasets.csvp` catalog listing, whose headers carry units in
//!   parentheses (`minLongitude (degrees_east)`)
//! - a dataset's `info/<id>/index.csv` attribute table
//!
//! Columns are matched by header name, so extra or reordered columns are
//! tolerated. Empty cells decode to `None`. Malformed rows are logged and
//! skipped.

use erddap_iso_shared::{AttributeRow, AttributeTable, CatalogRow, HarvestError, Result};
use serde::Deserialize;
use tracing::warn;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// A catalog row exactly as it appears in `allDatasets.csvp`.
#[derive(Debug, Deserialize)]
struct RawCatalogRow {
    #[serde(rename = "datasetID")]
    dataset_id: String,
    #[serde(default)]
    accessible: Option<String>,
    #[serde(rename = "dataStructure", default)]
    data_structure: Option<String>,
    #[serde(default)]
    tabledap: Option<String>,
    #[serde(default)]
    griddap: Option<String>,
    #[serde(rename = "infoUrl", default)]
    info_url: Option<String>,
    #[serde(rename = "sourceUrl", default)]
    source_url: Option<String>,
    #[serde(
        rename = "minLongitude (degrees_east)",
        default,
        deserialize_with = "csv::invalid_option"
    )]
    min_longitude: Option<f64>,
    #[serde(
        rename = "minLatitude (degrees_north)",
        default,
        deserialize_with = "csv::invalid_option"
    )]
    min_latitude: Option<f64>,
    #[serde(
        rename = "maxLongitude (degrees_east)",
        default,
        deserialize_with = "csv::invalid_option"
    )]
    max_longitude: Option<f64>,
    #[serde(
        rename = "maxLatitude (degrees_north)",
        default,
        deserialize_with = "csv::invalid_option"
    )]
    max_latitude: Option<f64>,
    #[serde(rename = "minTime (UTC)", default)]
    min_time: Option<String>,
    #[serde(rename = "maxTime (UTC)", default)]
    max_time: Option<String>,
    #[serde(default)]
    date_published: Option<String>,
}

impl From<RawCatalogRow> for CatalogRow {
    fn from(raw: RawCatalogRow) -> Self {
        Self {
            dataset_id: raw.dataset_id.trim().to_string(),
            accessible: non_blank(raw.accessible),
            data_structure: non_blank(raw.data_structure),
            tabledap: non_blank(raw.tabledap),
            griddap: non_blank(raw.griddap),
            info_url: non_blank(raw.info_url),
            source_url: non_blank(raw.source_url),
            min_longitude: finite(raw.min_longitude),
            min_latitude: finite(raw.min_latitude),
            max_longitude: finite(raw.max_longitude),
            max_latitude: finite(raw.max_latitude),
            min_time: non_blank(raw.min_time),
            max_time: non_blank(raw.max_time),
            date_published: non_blank(raw.date_published),
        }
    }
}

/// An attribute row exactly as it appears in `index.csv`.
#[derive(Debug, Deserialize)]
struct RawAttributeRow {
    #[serde(rename = "Row Type", default)]
    row_type: String,
    #[serde(rename = "Variable Name")]
    variable_name: String,
    #[serde(rename = "Attribute Name", default)]
    attribute_name: String,
    #[serde(rename = "Data Type", default)]
    data_type: String,
    #[serde(rename = "Value", default)]
    value: Option<String>,
}

impl From<RawAttributeRow> for AttributeRow {
    fn from(raw: RawAttributeRow) -> Self {
        Self {
            row_type: raw.row_type,
            entity_name: raw.variable_name,
            attribute_name: raw.attribute_name,
            data_type: raw.data_type,
            value: non_blank(raw.value),
        }
    }
}

// ---------------------------------------------------------------------------
// Decoders
// ---------------------------------------------------------------------------

/// Decode an `allDatasets.csvp` body into catalog rows.
pub(crate) fn parse_catalog_csv(content: &str) -> Result<Vec<CatalogRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(content.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| HarvestError::parse(format!("catalog header: {e}")))?;
    if !headers.iter().any(|h| h == "datasetID") {
        return Err(HarvestError::parse(
            "catalog response has no datasetID column",
        ));
    }

    let mut rows = Vec::new();
    for result in reader.deserialize::<RawCatalogRow>() {
        match result {
            Ok(raw) => rows.push(CatalogRow::from(raw)),
            Err(e) => warn!(error = %e, "skipping malformed catalog row"),
        }
    }

    Ok(rows)
}

/// Decode an `info/<id>/index.csv` body into an attribute table.
pub(crate) fn parse_attribute_csv(content: &str) -> Result<AttributeTable> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(content.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| HarvestError::parse(format!("attribute table header: {e}")))?;
    if !headers.iter().any(|h| h == "Variable Name") {
        return Err(HarvestError::parse(
            "attribute table has no 'Variable Name' column",
        ));
    }

    let mut rows = Vec::new();
    for result in reader.deserialize::<RawAttributeRow>() {
        match result {
            Ok(raw) => rows.push(AttributeRow::from(raw)),
            Err(e) => warn!(error = %e, "skipping malformed attribute row"),
        }
    }

    Ok(AttributeTable::new(rows))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}
