//! Metadata record assembler.
//!
//! Two stages, both working on clones of the MCF skeleton:
//! - [`assemble_catalog`] turns catalog rows into one summary record per
//!   dataset (access URL, distribution links, bounding box, catalog dates)
//! - [`assemble_detail`] enriches a record in place from the dataset's
//!   attribute table (titles, keywords, dates, contacts, platform, extents)

use std::collections::BTreeMap;
use std::path::Path;

use erddap_iso_shared::{
    ALL_DATASETS_ID, AttributeTable, Bilingual, CatalogRow, Distribution, GLOBAL_ENTITY,
    HarvestConfig, HarvestError, Instrument, MetadataRecord, Result, Role, VariableInfo,
};
use serde_yml::Value;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::contacts::build_contacts;
use crate::lookup::{global, global_f64, global_owned};
use crate::sanitize::{
    dedup_keywords, escape_xml, keyword_list, normalize_category_path, split_and_strip,
};
use crate::temporal::{self, ResolvedDate};

/// Records keyed by dataset id, in id order.
pub type Catalog = BTreeMap<String, MetadataRecord>;

/// Distribution names for the optional catalog links.
const INFO_LINK_NAME: (&str, &str) =
    ("Dataset information", "Information sur le jeu de données");
const SOURCE_LINK_NAME: (&str, &str) = ("Data source", "Source des données");

/// Per-run field handling taken from the `[template]` config section.
#[derive(Debug, Clone, Default)]
pub struct FieldOptions {
    /// Fields that get category-path flattening and keyword dedup.
    pub sanitize_fields: Vec<String>,
    /// Optional `NC_GLOBAL` fields copied verbatim to the record.
    pub opt_rec_variables: Vec<String>,
}

impl From<&HarvestConfig> for FieldOptions {
    fn from(config: &HarvestConfig) -> Self {
        Self {
            sanitize_fields: config.sanitize_fields.clone(),
            opt_rec_variables: config.opt_rec_variables.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Template
// ---------------------------------------------------------------------------

/// Load the MCF skeleton from disk.
pub fn load_template(path: &Path) -> Result<MetadataRecord> {
    let content = std::fs::read_to_string(path).map_err(|e| HarvestError::io(path, e))?;
    parse_template(&content)
        .map_err(|e| HarvestError::template(format!("{}: {e}", path.display())))
}

/// Parse an MCF skeleton from YAML text.
pub fn parse_template(content: &str) -> Result<MetadataRecord> {
    serde_yml::from_str(content).map_err(|e| HarvestError::template(e.to_string()))
}

// ---------------------------------------------------------------------------
// Catalog stage
// ---------------------------------------------------------------------------

/// Build one summary record per publicly accessible dataset.
///
/// The synthetic `allDatasets` row and rows not marked `public` are
/// skipped. Every record starts as its own clone of `template`.
/// `default_protocol` (`tabledap` or `griddap`) picks the access URL for
/// rows that don't declare a `dataStructure`.
#[instrument(skip_all, fields(rows = rows.len(), default_protocol = %default_protocol))]
pub fn assemble_catalog(
    rows: &[CatalogRow],
    template: &MetadataRecord,
    default_protocol: &str,
) -> Catalog {
    let mut catalog = Catalog::new();

    for row in rows {
        if row.dataset_id == ALL_DATASETS_ID || row.dataset_id.is_empty() {
            continue;
        }
        if row.accessible.as_deref().is_some_and(|a| a != "public") {
            debug!(
                dataset_id = %row.dataset_id,
                accessible = ?row.accessible,
                "skipping non-public dataset"
            );
            continue;
        }

        let record = catalog_record(row, template, default_protocol);
        catalog.insert(row.dataset_id.clone(), record);
    }

    info!(datasets = catalog.len(), "catalog assembled");
    catalog
}

/// Summary record for one catalog row.
pub fn catalog_record(
    row: &CatalogRow,
    template: &MetadataRecord,
    default_protocol: &str,
) -> MetadataRecord {
    let mut record = template.clone();

    let primary_url = access_url(row, default_protocol);
    if primary_url.is_none() {
        warn!(dataset_id = %row.dataset_id, "catalog row has no access URL");
    }
    set_primary_access(&mut record, primary_url.map(escape_xml));

    let links = [
        (row.info_url.as_deref(), INFO_LINK_NAME),
        (row.source_url.as_deref(), SOURCE_LINK_NAME),
    ];
    for (link, (en, fr)) in links {
        match link {
            Some(url) if is_valid_url(url) => record.distribution.push(Distribution {
                url: Some(url.to_string()),
                name: Bilingual::new(Some(en), Some(fr)),
                description: Bilingual::default(),
            }),
            Some(url) => debug!(dataset_id = %row.dataset_id, url, "ignoring non-URL link"),
            None => {}
        }
    }

    record.spatial.bbox = match (
        row.min_longitude,
        row.min_latitude,
        row.max_longitude,
        row.max_latitude,
    ) {
        (Some(min_lon), Some(min_lat), Some(max_lon), Some(max_lat)) => {
            Some([min_lon, min_lat, max_lon, max_lat])
        }
        _ => {
            debug!(dataset_id = %row.dataset_id, "incomplete bounding box");
            None
        }
    };

    // minTime stands in for the coverage start, so it gets the same
    // YYYY-MM-DD form as a coverage-derived date.
    let dates = &mut record.identification.dates;
    dates.publication = row.date_published.clone().or_else(|| {
        let min_time = row.min_time.as_deref()?;
        let date = temporal::parse_timestamp(min_time).map(|ts| temporal::iso_date(&ts));
        date.or_else(|| Some(min_time.to_string()))
    });
    dates.revision = row.max_time.clone();

    record
}

/// Tabledap URL for `table` rows, griddap for `grid` rows.
///
/// Rows without a `dataStructure` follow `default_protocol`.
fn access_url<'a>(row: &'a CatalogRow, default_protocol: &str) -> Option<&'a str> {
    let tabular = match row.data_structure.as_deref() {
        Some(structure) => structure == "table",
        None => default_protocol != "griddap",
    };
    if tabular {
        row.tabledap.as_deref()
    } else {
        row.griddap.as_deref()
    }
}

/// Point the first distribution entry at the dataset's access form.
fn set_primary_access(record: &mut MetadataRecord, url: Option<String>) {
    match record.distribution.first_mut() {
        Some(primary) => primary.url = url,
        None => record.distribution.push(Distribution {
            url,
            ..Distribution::default()
        }),
    }
}

/// `true` for absolute http(s) URLs with a host.
pub fn is_valid_url(raw: &str) -> bool {
    Url::parse(raw.trim())
        .map(|url| matches!(url.scheme(), "http" | "https") && url.host_str().is_some())
        .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Detail stage
// ---------------------------------------------------------------------------

/// Enrich `record` in place from the dataset's attribute table.
///
/// Missing attributes leave their fields empty; nothing here aborts.
#[instrument(skip_all, fields(attributes = table.len()))]
pub fn assemble_detail(
    table: &AttributeTable,
    record: &mut MetadataRecord,
    options: &FieldOptions,
) {
    apply_metadata_section(table, record);
    apply_identification(table, record);
    apply_temporal(table, record);

    record.spatial.vertical = vertical_extent(table);
    record.contact = build_contacts(table, &Role::ALL);

    apply_platform(table, record);
    record.dataset = describe_variables(table);

    copy_optional_fields(table, record, options);
    dedup_sanitized_fields(record, options);
}

fn apply_metadata_section(table: &AttributeTable, record: &mut MetadataRecord) {
    let metadata = &mut record.metadata;
    metadata.identifier = global_owned(table, "uuid");
    metadata.comment = global_owned(table, "comment");
    metadata.history = global_owned(table, "history");
    metadata.use_constraints.licence = global_owned(table, "license");
    metadata.dates.revision = global_owned(table, "date_metadata_modified");
}

fn apply_identification(table: &AttributeTable, record: &mut MetadataRecord) {
    let ident = &mut record.identification;
    ident.title = bilingual(table, "title");
    ident.abstract_ = bilingual(table, "summary");
    ident.project = bilingual(table, "project");
    ident.acknowledgement = bilingual(table, "acknowledgement");

    ident.keywords.default.en = keywords(table, "keywords");
    ident.keywords.default.fr = keywords(table, "keywords_fra");
    ident.keywords.eov.en = keywords(table, "eov");
    ident.keywords.eov.fr = keywords(table, "eov_fra");

    // Keep the skeleton's default status when the dataset doesn't declare one.
    ident.progress_code = global_owned(table, "progress")
        .or_else(|| global_owned(table, "status"))
        .or_else(|| ident.progress_code.take());
}

fn apply_temporal(table: &AttributeTable, record: &mut MetadataRecord) {
    let extent = temporal::resolve_from_table(table);
    let ident = &mut record.identification;

    ident.temporal_begin = extent.begin;
    ident.temporal_end = extent.end;
    ident.temporal_duration = extent.duration;

    let dates = &mut ident.dates;
    dates.creation = merge_date(extent.creation, dates.creation.take());
    dates.publication = merge_date(extent.publication, dates.publication.take());
    dates.revision = global_owned(table, "date_modified").or_else(|| dates.revision.take());
}

/// An explicit attribute date always wins; a coverage-derived one only
/// fills a slot the catalog left empty.
fn merge_date(resolved: Option<ResolvedDate>, current: Option<String>) -> Option<String> {
    match resolved {
        Some(date) if date.is_explicit() || current.is_none() => Some(date.value),
        _ => current,
    }
}

/// Vertical extent, positive down.
///
/// Precedence: an explicit min/max pair, then a single `depth` used for
/// both bounds, then `altitude` sign-flipped for both bounds. `None` when
/// none of these resolve.
pub fn vertical_extent(table: &AttributeTable) -> Option<[f64; 2]> {
    let pair = (
        global_f64(table, "geospatial_vertical_min"),
        global_f64(table, "geospatial_vertical_max"),
    );
    if let (Some(min), Some(max)) = pair {
        return Some([min, max]);
    }

    if let Some(depth) = global_f64(table, "depth") {
        return Some([depth, depth]);
    }

    if let Some(altitude) = global_f64(table, "altitude") {
        // 0.0 - x instead of -x so a zero altitude stays 0.0, not -0.0.
        let depth = 0.0 - altitude;
        return Some([depth, depth]);
    }

    None
}

fn apply_platform(table: &AttributeTable, record: &mut MetadataRecord) {
    let platform = &mut record.platform;
    platform.id = global_owned(table, "platform_id");
    platform.description = bilingual(table, "platform");
    platform.instruments = split_and_strip(global(table, "instrument"), ',')
        .unwrap_or_default()
        .into_iter()
        .map(|name| Instrument {
            id: Some(name),
            description: Bilingual::default(),
        })
        .collect();
}

/// `long_name`, `units` and declared data type for every non-global variable.
pub fn describe_variables(table: &AttributeTable) -> BTreeMap<String, VariableInfo> {
    let mut variables: BTreeMap<String, VariableInfo> = BTreeMap::new();

    for row in table.rows() {
        if row.entity_name == GLOBAL_ENTITY {
            continue;
        }
        let info = variables.entry(row.entity_name.clone()).or_default();

        if row.is_variable() {
            info.data_type = Some(row.data_type.clone()).filter(|t| !t.is_empty());
            continue;
        }
        match row.attribute_name.as_str() {
            "long_name" if info.long_name.is_none() => info.long_name = row.value.clone(),
            "units" if info.units.is_none() => info.units = row.value.clone(),
            _ => {}
        }
    }

    variables
}

fn copy_optional_fields(
    table: &AttributeTable,
    record: &mut MetadataRecord,
    options: &FieldOptions,
) {
    for field in &options.opt_rec_variables {
        if MetadataRecord::SECTIONS.contains(&field.as_str()) {
            warn!(field = %field, "optional field collides with a record section, skipping");
            continue;
        }

        let Some(value) = global(table, field) else {
            info!(field = %field, "optional field not found in NC_GLOBAL");
            continue;
        };

        let value = if options.sanitize_fields.contains(field) {
            normalize_category_path(value)
        } else {
            value.to_string()
        };
        record.extra.insert(field.clone(), Value::String(escape_xml(&value)));
    }
}

/// Collapse duplicate keywords in each sanitized field; a missing field becomes `null`.
fn dedup_sanitized_fields(record: &mut MetadataRecord, options: &FieldOptions) {
    for field in &options.sanitize_fields {
        if MetadataRecord::SECTIONS.contains(&field.as_str()) {
            continue;
        }

        let current = record.extra.get(field).and_then(Value::as_str);
        let deduped = dedup_keywords(current);
        if deduped.is_none() {
            debug!(field = %field, "sanitized field absent");
        }

        record
            .extra
            .insert(field.clone(), deduped.map(Value::String).unwrap_or(Value::Null));
    }
}

fn bilingual(table: &AttributeTable, attribute: &str) -> Bilingual {
    Bilingual::new(global(table, attribute), global(table, &format!("{attribute}_fra")))
}

fn keywords(table: &AttributeTable, attribute: &str) -> Vec<String> {
    let flattened = global(table, attribute).map(normalize_category_path);
    keyword_list(flattened.as_deref())
}
