//! Include/exclude filtering of the harvested catalog.

use erddap_iso_shared::{HarvestError, Result};
use tracing::{debug, info};

use crate::assembler::Catalog;

/// Apply include then exclude lists to `catalog`.
///
/// A non-empty `include` restricts the catalog to exactly those ids; an id
/// the server didn't list is a configuration mismatch and fails the call.
/// Excluding an id that isn't present is logged and ignored.
pub fn filter_catalog(
    catalog: Catalog,
    include: &[String],
    exclude: &[String],
) -> Result<Catalog> {
    let mut catalog = if include.is_empty() {
        catalog
    } else {
        let mut source = catalog;
        let mut kept = Catalog::new();
        for id in include {
            if kept.contains_key(id) {
                continue;
            }
            let record = source
                .remove(id)
                .ok_or_else(|| HarvestError::dataset_not_found(id))?;
            kept.insert(id.clone(), record);
        }
        debug!(kept = kept.len(), dropped = source.len(), "include list applied");
        kept
    };

    for id in exclude {
        if catalog.remove(id).is_some() {
            debug!(dataset_id = %id, "dataset excluded");
        } else {
            info!(dataset_id = %id, "excluded dataset is not in the catalog");
        }
    }

    Ok(catalog)
}
