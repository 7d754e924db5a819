//! Station repositioning.
//!
//! Fixed stations publish a nominal position in a stations JSON document.
//! Already-written records whose file stem matches a station's `erddap_id`
//! get their bounding box replaced by a small box around that position.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use erddap_iso_shared::{HarvestError, Result};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::writer::{read_record, write_record};

/// Default half-width of the box, in degrees, on each axis.
pub const DEFAULT_ADJUST: f64 = 0.02;

/// `{ "stations": { "<name>": { "erddap_id": ..., "location": [lat, lon] } } }`
#[derive(Debug, Clone, Deserialize)]
pub struct StationsDocument {
    pub stations: BTreeMap<String, Station>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Station {
    pub erddap_id: String,
    /// `[latitude, longitude]`.
    pub location: [f64; 2],
}

impl StationsDocument {
    /// Station positions keyed by dataset id.
    pub fn locations(&self) -> BTreeMap<&str, [f64; 2]> {
        self.stations
            .values()
            .map(|station| (station.erddap_id.as_str(), station.location))
            .collect()
    }
}

/// Box half-widths applied around each station.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RepositionOptions {
    pub lat_adjust: f64,
    pub lon_adjust: f64,
}

impl Default for RepositionOptions {
    fn default() -> Self {
        Self {
            lat_adjust: DEFAULT_ADJUST,
            lon_adjust: DEFAULT_ADJUST,
        }
    }
}

/// Outcome of a repositioning pass.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RepositionSummary {
    /// Files whose bounding box was rewritten.
    pub updated: Vec<PathBuf>,
    /// Dataset ids with no matching station.
    pub unmatched: Vec<String>,
    /// Matching files that could not be rewritten.
    pub failed: Vec<PathBuf>,
}

/// Fetch and decode the stations document.
#[instrument(skip(timeout))]
pub async fn fetch_stations(url: &str, timeout: Duration) -> Result<StationsDocument> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| HarvestError::Network(format!("failed to build HTTP client: {e}")))?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| HarvestError::Network(format!("{url}: {e}")))?;

    if !response.status().is_success() {
        return Err(HarvestError::Network(format!(
            "{url}: HTTP {}",
            response.status()
        )));
    }

    let body = response
        .text()
        .await
        .map_err(|e| HarvestError::Network(format!("{url}: {e}")))?;

    let document: StationsDocument = serde_json::from_str(&body)
        .map_err(|e| HarvestError::parse(format!("stations document: {e}")))?;

    info!(stations = document.stations.len(), "fetched stations");
    Ok(document)
}

/// `[lon_min, lat_min, lon_max, lat_max]` around a `[lat, lon]` position.
pub fn station_bbox(location: [f64; 2], options: &RepositionOptions) -> [f64; 4] {
    let [lat, lon] = location;
    [
        lon - options.lon_adjust,
        lat - options.lat_adjust,
        lon + options.lon_adjust,
        lat + options.lat_adjust,
    ]
}

/// Rewrite the bounding box of every matching `*.yml` in `target_dir`.
///
/// Files that fail to parse are logged and left untouched. A failed write is
/// logged and recorded in [`RepositionSummary::failed`]; the pass continues.
#[instrument(skip(stations, options), fields(target_dir = %target_dir.display()))]
pub fn reposition_dir(
    target_dir: &Path,
    stations: &StationsDocument,
    options: &RepositionOptions,
) -> Result<RepositionSummary> {
    let locations = stations.locations();
    let mut summary = RepositionSummary::default();

    let entries = std::fs::read_dir(target_dir).map_err(|e| HarvestError::io(target_dir, e))?;
    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "yml"))
        .collect();
    paths.sort();

    for path in paths {
        let Some(dataset_id) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        // Hidden files.
        if dataset_id.starts_with('.') {
            continue;
        }

        let Some(location) = locations.get(dataset_id) else {
            warn!(dataset_id, "record does not match any station");
            summary.unmatched.push(dataset_id.to_string());
            continue;
        };

        let mut record = match read_record(&path) {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "unreadable record, skipping");
                continue;
            }
        };

        let bbox = station_bbox(*location, options);
        debug!(dataset_id, old = ?record.spatial.bbox, new = ?bbox, "repositioning");
        record.spatial.bbox = Some(bbox);

        match write_record(target_dir, dataset_id, &record) {
            Ok(_) => summary.updated.push(path),
            Err(e) => {
                warn!(dataset_id, error = %e, "failed to rewrite record");
                summary.failed.push(path);
            }
        }
    }

    info!(
        updated = summary.updated.len(),
        unmatched = summary.unmatched.len(),
        failed = summary.failed.len(),
        "repositioning complete"
    );
    Ok(summary)
}
