//! YAML output: one `{dataset_id}.yml` per record.

use std::path::{Path, PathBuf};

use erddap_iso_shared::{HarvestError, MetadataRecord, Result};
use tracing::{debug, error, instrument};

/// Reject ids that are empty or could leave `target_dir` once joined.
pub fn validate_dataset_id(dataset_id: &str) -> Result<()> {
    let unsafe_id = dataset_id.is_empty()
        || dataset_id.contains(['/', '\\'])
        || dataset_id.contains("..");
    if unsafe_id {
        return Err(HarvestError::invalid_dataset_id(dataset_id));
    }
    Ok(())
}

/// Output path for a dataset.
pub fn record_path(target_dir: &Path, dataset_id: &str) -> PathBuf {
    target_dir.join(format!("{dataset_id}.yml"))
}

/// Serialize and write one record, creating `target_dir` if needed.
///
/// Writes to a dot-prefixed temp file first and renames it into place, so a
/// failed write never leaves a truncated `.yml` behind. Ids containing a path
/// separator or `..` are refused before anything touches the disk.
pub fn write_record(
    target_dir: &Path,
    dataset_id: &str,
    record: &MetadataRecord,
) -> Result<PathBuf> {
    validate_dataset_id(dataset_id)?;
    std::fs::create_dir_all(target_dir).map_err(|e| HarvestError::io(target_dir, e))?;

    let yaml = serde_yml::to_string(record)
        .map_err(|e| HarvestError::Serialize(format!("{dataset_id}: {e}")))?;

    let target = record_path(target_dir, dataset_id);
    let temp = target_dir.join(format!(".{dataset_id}.yml.tmp"));

    std::fs::write(&temp, &yaml).map_err(|e| HarvestError::io(&temp, e))?;
    std::fs::rename(&temp, &target).map_err(|e| HarvestError::io(&target, e))?;

    debug!(path = %target.display(), size = yaml.len(), "wrote record");
    Ok(target)
}

/// Write a record, logging failures instead of returning them.
///
/// On failure the record itself is dumped at error level for diagnosis.
#[instrument(skip(target_dir, record))]
pub fn write_or_log(
    target_dir: &Path,
    dataset_id: &str,
    record: &MetadataRecord,
) -> Option<PathBuf> {
    match write_record(target_dir, dataset_id, record) {
        Ok(path) => Some(path),
        Err(e) => {
            error!(error = %e, record = ?record, "failed to write record, skipping");
            None
        }
    }
}

/// Read a previously written record back.
pub fn read_record(path: &Path) -> Result<MetadataRecord> {
    let content = std::fs::read_to_string(path).map_err(|e| HarvestError::io(path, e))?;
    serde_yml::from_str(&content)
        .map_err(|e| HarvestError::parse(format!("{}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use erddap_iso_shared::Bilingual;

    fn record() -> MetadataRecord {
        let mut record = MetadataRecord::default();
        record.identification.title = Bilingual::new(Some("Buoy"), None);
        record.spatial.bbox = Some([-64.0, 44.0, -63.0, 45.0]);
        record
    }

    #[test]
    fn writes_into_new_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("nested").join("out");

        let path = write_record(&target, "buoy", &record()).unwrap();
        assert_eq!(path, target.join("buoy.yml"));
        assert!(path.exists());
        assert!(!target.join(".buoy.yml.tmp").exists());
    }

    #[test]
    fn written_record_reads_back() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_record(tmp.path(), "buoy", &record()).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("title:"));
        assert!(content.contains("fr: null"));

        let back = read_record(&path).unwrap();
        assert_eq!(back, record());
    }

    #[test]
    fn rewrite_overwrites() {
        let tmp = tempfile::tempdir().unwrap();
        write_record(tmp.path(), "buoy", &record()).unwrap();

        let mut changed = record();
        changed.spatial.bbox = None;
        let path = write_record(tmp.path(), "buoy", &changed).unwrap();
        assert_eq!(read_record(&path).unwrap().spatial.bbox, None);
    }

    #[test]
    fn failed_write_is_logged_not_returned() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("file");
        std::fs::write(&blocker, "x").unwrap();

        // target_dir is a regular file, so create_dir_all fails
        assert_eq!(write_or_log(&blocker, "buoy", &record()), None);
    }

    #[test]
    fn ids_that_leave_target_dir_are_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("out");

        for id in ["../escape", "a/b", "a\\b", "..", ""] {
            match write_record(&target, id, &record()) {
                Err(HarvestError::InvalidDatasetId { dataset_id }) => assert_eq!(dataset_id, id),
                other => panic!("{id}: expected InvalidDatasetId, got {other:?}"),
            }
        }
        assert!(!target.exists());
        assert!(!tmp.path().join("escape.yml").exists());
        assert_eq!(write_or_log(&target, "../escape", &record()), None);
    }

    #[test]
    fn dotted_ids_are_allowed() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_record(tmp.path(), "buoy.v2_hourly", &record()).unwrap();
        assert_eq!(path, tmp.path().join("buoy.v2_hourly.yml"));
    }
}
