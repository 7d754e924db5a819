//! End-to-end harvest pipeline: catalog → filter → per-dataset detail → YAML → XML.

use std::path::PathBuf;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{Instrument, info, info_span, instrument, warn};
use uuid::Uuid;

use erddap_iso_shared::{HarvestConfig, Result};
use erddap_iso_source::MetadataSource;

use crate::assembler::{FieldOptions, assemble_catalog, assemble_detail, load_template};
use crate::filter::filter_catalog;
use crate::generator;
use crate::writer;

/// Identity of one harvest run, carried on every log line it produces.
#[derive(Debug, Clone)]
pub struct HarvestContext {
    pub run_id: Uuid,
    pub server: String,
    pub started_at: DateTime<Utc>,
}

impl HarvestContext {
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::now_v7(),
            server: server.into(),
            started_at: Utc::now(),
        }
    }
}

/// Result of a harvest run.
#[derive(Debug)]
pub struct HarvestResult {
    pub run_id: Uuid,
    /// Datasets left after filtering.
    pub dataset_count: usize,
    /// YAML files written.
    pub written: Vec<PathBuf>,
    /// Datasets whose attribute fetch or write failed.
    pub skipped: Vec<String>,
    /// Files the XML generator converted (0 when no generator is configured).
    pub generated: usize,
    pub elapsed: std::time::Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each dataset is processed, written or not.
    fn dataset_done(&self, dataset_id: &str, current: usize, total: usize);
    /// Called when the pipeline completes.
    fn done(&self, result: &HarvestResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn dataset_done(&self, _dataset_id: &str, _current: usize, _total: usize) {}
    fn done(&self, _result: &HarvestResult) {}
}

/// Run the full harvest.
///
/// 1. Load the MCF skeleton
/// 2. Fetch and assemble the catalog
/// 3. Apply include/exclude
/// 4. Enrich each dataset from its attribute table and write it
/// 5. Run the XML generator over the written files, if configured
///
/// Catalog, template and filter failures abort the run. A failed attribute
/// fetch or write only skips that dataset.
#[instrument(skip_all, name = "harvest", fields(run_id = %ctx.run_id, server = %ctx.server))]
pub async fn run_harvest<S: MetadataSource>(
    ctx: &HarvestContext,
    config: &HarvestConfig,
    source: &S,
    progress: &dyn ProgressReporter,
) -> Result<HarvestResult> {
    let start = Instant::now();
    info!(
        started_at = %ctx.started_at,
        target_dir = %config.target_dir.display(),
        "starting harvest"
    );

    // --- Phase 1: Template ---
    progress.phase("Loading template");
    let template = load_template(&config.template_path)?;

    // --- Phase 2: Catalog ---
    progress.phase("Fetching dataset catalog");
    let rows = source.fetch_catalog().await?;
    let catalog = assemble_catalog(&rows, &template, &config.protocol);

    // --- Phase 3: Filter ---
    let catalog = filter_catalog(catalog, &config.include, &config.exclude)?;
    let total = catalog.len();
    info!(datasets = total, "catalog filtered");

    // --- Phase 4: Per-dataset detail ---
    progress.phase("Harvesting dataset attributes");
    let options = FieldOptions::from(config);
    let mut written = Vec::with_capacity(total);
    let mut skipped = Vec::new();

    for (i, (dataset_id, mut record)) in catalog.into_iter().enumerate() {
        let span = info_span!("dataset", dataset_id = %dataset_id);

        match source
            .fetch_attributes(&dataset_id)
            .instrument(span.clone())
            .await
        {
            Ok(table) => {
                let _entered = span.enter();
                assemble_detail(&table, &mut record, &options);
                match writer::write_or_log(&config.target_dir, &dataset_id, &record) {
                    Some(path) => written.push(path),
                    None => skipped.push(dataset_id.clone()),
                }
            }
            Err(e) => {
                span.in_scope(|| warn!(error = %e, "attribute fetch failed, skipping dataset"));
                skipped.push(dataset_id.clone());
            }
        }

        progress.dataset_done(&dataset_id, i + 1, total);
    }

    // --- Phase 5: XML ---
    let generated = match &config.generator {
        Some(generator_config) if !written.is_empty() => {
            progress.phase("Generating XML");
            generator::generate_all(generator_config, &written)
        }
        _ => 0,
    };

    let result = HarvestResult {
        run_id: ctx.run_id,
        dataset_count: total,
        written,
        skipped,
        generated,
        elapsed: start.elapsed(),
    };

    info!(
        written = result.written.len(),
        skipped = result.skipped.len(),
        generated = result.generated,
        elapsed_ms = result.elapsed.as_millis() as u64,
        "harvest complete"
    );

    progress.done(&result);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use erddap_iso_shared::{
        AppConfig, AttributeRow, AttributeTable, CatalogRow, HarvestError, MetadataRecord,
    };

    /// Source backed by fixed rows; unknown datasets fail like a 404 would.
    struct InMemorySource {
        catalog: Vec<CatalogRow>,
        tables: HashMap<String, AttributeTable>,
    }

    impl MetadataSource for InMemorySource {
        async fn fetch_catalog(&self) -> Result<Vec<CatalogRow>> {
            Ok(self.catalog.clone())
        }

        async fn fetch_attributes(&self, dataset_id: &str) -> Result<AttributeTable> {
            self.tables
                .get(dataset_id)
                .cloned()
                .ok_or_else(|| HarvestError::Network(format!("{dataset_id}: HTTP 404")))
        }
    }

    fn row(id: &str) -> CatalogRow {
        CatalogRow {
            dataset_id: id.into(),
            accessible: Some("public".into()),
            data_structure: Some("table".into()),
            tabledap: Some(format!("https://erddap.example.org/erddap/tabledap/{id}")),
            info_url: Some("https://example.org/about".into()),
            min_longitude: Some(-64.0),
            min_latitude: Some(44.0),
            max_longitude: Some(-63.0),
            max_latitude: Some(45.0),
            ..CatalogRow::default()
        }
    }

    fn source() -> InMemorySource {
        let mut tables = HashMap::new();
        for id in ["buoy_a", "buoy_b", "buoy_d"] {
            tables.insert(
                id.to_string(),
                AttributeTable::new(vec![
                    AttributeRow::global("title", &format!("Buoy {id}")),
                    AttributeRow::global("keywords", "waves, tide, waves"),
                    AttributeRow::global("time_coverage_start", "2020-01-01T00:00:00Z"),
                    AttributeRow::global("time_coverage_end", "2020-01-11T00:00:00Z"),
                ]),
            );
        }

        InMemorySource {
            catalog: vec![
                CatalogRow {
                    dataset_id: "allDatasets".into(),
                    ..CatalogRow::default()
                },
                row("buoy_a"),
                row("buoy_b"),
                // listed but its attribute table is unavailable
                row("buoy_c"),
                row("buoy_d"),
            ],
            tables,
        }
    }

    fn config(target_dir: PathBuf) -> HarvestConfig {
        let mut config = HarvestConfig::from(&AppConfig::default());
        config.template_path = PathBuf::from("../../../fixtures/mcf/template.yml");
        config.exclude = vec!["buoy_d".into()];
        config.target_dir = target_dir;
        config
    }

    #[tokio::test]
    async fn harvest_writes_enriched_records_and_skips_failures() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config(tmp.path().join("out"));
        let ctx = HarvestContext::new("https://erddap.example.org/erddap");

        let result = run_harvest(&ctx, &config, &source(), &SilentProgress)
            .await
            .unwrap();

        assert_eq!(result.run_id, ctx.run_id);
        assert_eq!(result.dataset_count, 3);
        assert_eq!(result.written.len(), 2);
        assert_eq!(result.skipped, vec!["buoy_c".to_string()]);
        assert_eq!(result.generated, 0);
        assert!(!tmp.path().join("out/buoy_c.yml").exists());
        assert!(!tmp.path().join("out/buoy_d.yml").exists());

        let record = writer::read_record(&tmp.path().join("out/buoy_a.yml")).unwrap();
        assert_eq!(record.identification.title.en.as_deref(), Some("Buoy buoy_a"));
        assert_eq!(record.identification.temporal_duration.as_deref(), Some("P10D"));
        assert_eq!(record.distribution.len(), 2);
        assert_eq!(record.contact.len(), 3);
        assert_eq!(
            record.extra.get("keywords").and_then(serde_yml::Value::as_str),
            Some("tide,waves")
        );
    }

    #[tokio::test]
    async fn unknown_include_aborts_before_writing() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = config(tmp.path().join("out"));
        config.include = vec!["buoy_a".into(), "nope".into()];

        let err = run_harvest(&HarvestContext::new("x"), &config, &source(), &SilentProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, HarvestError::DatasetNotFound { .. }));
        assert!(!tmp.path().join("out").exists());
    }

    #[tokio::test]
    async fn missing_template_aborts() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = config(tmp.path().join("out"));
        config.template_path = tmp.path().join("absent.yml");

        let err = run_harvest(&HarvestContext::new("x"), &config, &source(), &SilentProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, HarvestError::Io { .. }));
    }

    #[tokio::test]
    async fn records_are_independent_copies() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config(tmp.path().join("out"));
        run_harvest(&HarvestContext::new("x"), &config, &source(), &SilentProgress)
            .await
            .unwrap();

        let a: MetadataRecord = writer::read_record(&tmp.path().join("out/buoy_a.yml")).unwrap();
        let b: MetadataRecord = writer::read_record(&tmp.path().join("out/buoy_b.yml")).unwrap();
        assert_ne!(a.identification.title, b.identification.title);
        assert_eq!(a.distribution.len(), b.distribution.len());
    }

    #[test]
    fn run_ids_are_unique() {
        assert_ne!(HarvestContext::new("x").run_id, HarvestContext::new("x").run_id);
    }
}
