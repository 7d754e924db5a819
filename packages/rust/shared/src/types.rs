//! Core domain types: the raw attribute table, catalog rows, and the
//! normalized metadata record written for each dataset.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Entity name ERDDAP uses for dataset-wide attributes.
pub const GLOBAL_ENTITY: &str = "NC_GLOBAL";

/// Id of the synthetic catalog row describing the catalog itself.
pub const ALL_DATASETS_ID: &str = "allDatasets";

// ---------------------------------------------------------------------------
// Attribute table
// ---------------------------------------------------------------------------

/// One row of a dataset's attribute table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeRow {
    /// `attribute` or `variable`.
    pub row_type: String,
    /// `NC_GLOBAL` or a variable name.
    pub entity_name: String,
    /// Empty on `variable` rows.
    pub attribute_name: String,
    /// `String`, `double`, `int`, ...
    pub data_type: String,
    /// `None` when the source cell was empty.
    pub value: Option<String>,
}

impl AttributeRow {
    /// Shorthand for an `NC_GLOBAL` string attribute.
    pub fn global(attribute_name: &str, value: &str) -> Self {
        Self::attribute(GLOBAL_ENTITY, attribute_name, value, "String")
    }

    /// An `attribute` row for any entity.
    pub fn attribute(
        entity_name: &str,
        attribute_name: &str,
        value: &str,
        data_type: &str,
    ) -> Self {
        Self {
            row_type: "attribute".into(),
            entity_name: entity_name.into(),
            attribute_name: attribute_name.into(),
            data_type: data_type.into(),
            value: Some(value.to_string()).filter(|v| !v.is_empty()),
        }
    }

    /// A `variable` row declaring a variable and its data type.
    pub fn variable(entity_name: &str, data_type: &str) -> Self {
        Self {
            row_type: "variable".into(),
            entity_name: entity_name.into(),
            attribute_name: String::new(),
            data_type: data_type.into(),
            value: None,
        }
    }

    pub fn is_variable(&self) -> bool {
        self.row_type == "variable"
    }
}

/// The ordered attribute rows for one dataset. Read-only once fetched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeTable {
    rows: Vec<AttributeRow>,
}

impl AttributeTable {
    pub fn new(rows: Vec<AttributeRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[AttributeRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl FromIterator<AttributeRow> for AttributeTable {
    fn from_iter<I: IntoIterator<Item = AttributeRow>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

// ---------------------------------------------------------------------------
// Catalog rows
// ---------------------------------------------------------------------------

/// One dataset as listed by the server's `allDatasets` catalog.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogRow {
    pub dataset_id: String,
    /// `public` or `log in`.
    pub accessible: Option<String>,
    /// `table` or `grid`.
    pub data_structure: Option<String>,
    pub tabledap: Option<String>,
    pub griddap: Option<String>,
    pub info_url: Option<String>,
    pub source_url: Option<String>,
    pub min_longitude: Option<f64>,
    pub min_latitude: Option<f64>,
    pub max_longitude: Option<f64>,
    pub max_latitude: Option<f64>,
    pub min_time: Option<String>,
    pub max_time: Option<String>,
    /// Only present when the server exposes it as a catalog column.
    pub date_published: Option<String>,
}

// ---------------------------------------------------------------------------
// Metadata record
// ---------------------------------------------------------------------------

/// A value carried in both English and French. Both keys are always
/// serialized, `null` when unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bilingual {
    pub en: Option<String>,
    pub fr: Option<String>,
}

impl Bilingual {
    pub fn new(en: Option<&str>, fr: Option<&str>) -> Self {
        Self {
            en: en.map(String::from),
            fr: fr.map(String::from),
        }
    }
}

/// Bilingual keyword list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BilingualList {
    pub en: Vec<String>,
    pub fr: Vec<String>,
}

/// Creation/publication/revision dates, `YYYY-MM-DD` or as published.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Dates {
    pub creation: Option<String>,
    pub publication: Option<String>,
    pub revision: Option<String>,
}

/// `metadata:` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataSection {
    pub identifier: Option<String>,
    pub comment: Option<String>,
    pub history: Option<String>,
    pub use_constraints: UseConstraints,
    pub dates: Dates,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UseConstraints {
    pub licence: Option<String>,
}

/// Keyword groups under `identification.keywords`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Keywords {
    pub default: BilingualList,
    /// Essential ocean variables.
    pub eov: BilingualList,
}

/// `identification:` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Identification {
    pub title: Bilingual,
    #[serde(rename = "abstract")]
    pub abstract_: Bilingual,
    pub keywords: Keywords,
    pub project: Bilingual,
    pub acknowledgement: Bilingual,
    pub progress_code: Option<String>,
    pub temporal_begin: Option<String>,
    pub temporal_end: Option<String>,
    /// ISO 8601 duration, e.g. `P10D`.
    pub temporal_duration: Option<String>,
    pub dates: Dates,
}

/// `spatial:` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Spatial {
    /// `[min_lon, min_lat, max_lon, max_lat]`.
    pub bbox: Option<[f64; 4]>,
    /// `[min_depth, max_depth]`, positive down. Omitted when unknown.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vertical: Option<[f64; 2]>,
}

/// A fixed contact category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Contributor,
    Creator,
    Publisher,
}

impl Role {
    /// Every role, in output order.
    pub const ALL: [Role; 3] = [Role::Contributor, Role::Creator, Role::Publisher];

    /// Attribute prefix, e.g. `creator` for `creator_name`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Contributor => "contributor",
            Self::Creator => "creator",
            Self::Publisher => "publisher",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Organization {
    pub name: Option<String>,
    pub url: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Individual {
    pub name: Option<String>,
    pub position: Option<String>,
    pub email: Option<String>,
}

/// One entry of the `contact:` list. `None` fields mean "no information".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Contact {
    pub roles: BTreeSet<Role>,
    pub organization: Organization,
    pub individual: Individual,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Instrument {
    pub id: Option<String>,
    pub description: Bilingual,
}

/// `platform:` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Platform {
    pub id: Option<String>,
    pub description: Bilingual,
    pub instruments: Vec<Instrument>,
}

/// One access point in the `distribution:` list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Distribution {
    pub url: Option<String>,
    pub name: Bilingual,
    pub description: Bilingual,
}

/// Field-level description of one dataset variable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VariableInfo {
    pub long_name: Option<String>,
    pub data_type: Option<String>,
    pub units: Option<String>,
}

/// The normalized, schema-shaped record written for one dataset.
///
/// Loaded once from the MCF skeleton and cloned per dataset, so no two
/// records share nested lists or maps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataRecord {
    pub metadata: MetadataSection,
    pub identification: Identification,
    pub spatial: Spatial,
    pub contact: Vec<Contact>,
    pub platform: Platform,
    pub distribution: Vec<Distribution>,
    /// Variable descriptions keyed by variable name.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub dataset: BTreeMap<String, VariableInfo>,
    /// Template keys this type doesn't model, plus copied optional fields.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yml::Value>,
}

impl MetadataRecord {
    /// Top-level keys owned by typed sections.
    pub const SECTIONS: [&'static str; 7] = [
        "metadata",
        "identification",
        "spatial",
        "contact",
        "platform",
        "distribution",
        "dataset",
    ];
}
