//! Attribute lookup over a dataset's attribute table.
//!
//! A missing attribute is an expected outcome, not a failure: every lookup
//! returns an [`Attribute`] whose fields are `None` when nothing matched.

use erddap_iso_shared::{AttributeTable, GLOBAL_ENTITY};
use tracing::debug;

/// The value and declared data type of one resolved attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Attribute<'a> {
    pub value: Option<&'a str>,
    pub data_type: Option<&'a str>,
}

impl<'a> Attribute<'a> {
    /// The absent-value result.
    pub const ABSENT: Attribute<'static> = Attribute {
        value: None,
        data_type: None,
    };

    pub fn is_absent(&self) -> bool {
        self.value.is_none()
    }

    /// The value as an owned string.
    pub fn to_owned_value(&self) -> Option<String> {
        self.value.map(String::from)
    }
}

/// Resolve `attribute_name` on `entity_name`.
///
/// The first matching `attribute` row wins when the table repeats a key.
/// `variable` rows never match since they carry no attribute name.
pub fn lookup<'a>(
    table: &'a AttributeTable,
    attribute_name: &str,
    entity_name: &str,
) -> Attribute<'a> {
    let found = table
        .rows()
        .iter()
        .find(|row| {
            !row.is_variable()
                && row.entity_name == entity_name
                && row.attribute_name == attribute_name
        });

    match found {
        Some(row) => Attribute {
            value: row.value.as_deref(),
            data_type: Some(row.data_type.as_str()).filter(|t| !t.is_empty()),
        },
        None => {
            debug!(
                attribute = attribute_name,
                entity = entity_name,
                "attribute not present"
            );
            Attribute::ABSENT
        }
    }
}

/// Resolve a dataset-wide (`NC_GLOBAL`) attribute value.
pub fn global<'a>(table: &'a AttributeTable, attribute_name: &str) -> Option<&'a str> {
    lookup(table, attribute_name, GLOBAL_ENTITY).value
}

/// Owned variant of [`global`].
pub fn global_owned(table: &AttributeTable, attribute_name: &str) -> Option<String> {
    global(table, attribute_name).map(String::from)
}

/// Parse a dataset-wide attribute as a number. Unparsable values are absent.
pub fn global_f64(table: &AttributeTable, attribute_name: &str) -> Option<f64> {
    let raw = global(table, attribute_name)?;
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Some(v),
        _ => {
            debug!(attribute = attribute_name, value = raw, "attribute is not a finite number");
            None
        }
    }
}
