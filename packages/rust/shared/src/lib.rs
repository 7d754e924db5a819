//! Shared types, error model, and configuration for the ERDDAP ISO harvester.
//!
//! This crate is the foundation depended on by all other harvester crates.
//! It provides:
//! - [`HarvestError`] — the unified error type
//! - Domain types ([`AttributeTable`], [`CatalogRow`], [`MetadataRecord`], [`Contact`])
//! - Configuration ([`AppConfig`], [`HarvestConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ErddapConfig, FilterConfig, GeneratorConfig, HarvestConfig, OutputConfig,
    TemplateConfig, config_dir, config_file_path, init_config, load_config, load_config_from,
    validate_server,
};
pub use error::{HarvestError, Result};
pub use types::{
    ALL_DATASETS_ID, AttributeRow, AttributeTable, Bilingual, BilingualList, CatalogRow, Contact,
    Dates, Distribution, GLOBAL_ENTITY, Identification, Individual, Instrument, Keywords,
    MetadataRecord, MetadataSection, Organization, Platform, Role, Spatial, UseConstraints,
    VariableInfo,
};
