//! Application configuration for the ERDDAP ISO harvester.
//!
//! User config lives at `~/.erddap-iso/erddap-iso.toml` unless a path is
//! given on the command line. CLI flags override config file values, which
//! override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{HarvestError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "erddap-iso.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".erddap-iso";

// ---------------------------------------------------------------------------
// Config structs (matching erddap-iso.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// ERDDAP server settings.
    #[serde(default)]
    pub erddap: ErddapConfig,

    /// MCF skeleton and field handling.
    #[serde(default)]
    pub template: TemplateConfig,

    /// Dataset include/exclude lists.
    #[serde(default)]
    pub filter: FilterConfig,

    /// Output location.
    #[serde(default)]
    pub output: OutputConfig,

    /// Optional external XML generator run on each written file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator: Option<GeneratorConfig>,
}

/// `[erddap]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErddapConfig {
    /// Base endpoint, e.g. `https://example.org/erddap`.
    #[serde(default)]
    pub erddap_server: String,

    /// Data protocol variant: `tabledap` or `griddap`.
    #[serde(default = "default_protocol")]
    pub erddap_protocol: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Skip TLS certificate verification for this server only.
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

impl Default for ErddapConfig {
    fn default() -> Self {
        Self {
            erddap_server: String::new(),
            erddap_protocol: default_protocol(),
            timeout_secs: default_timeout_secs(),
            accept_invalid_certs: false,
        }
    }
}

fn default_protocol() -> String {
    "tabledap".into()
}
fn default_timeout_secs() -> u64 {
    30
}

/// `[template]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateConfig {
    /// Path to the MCF skeleton YAML.
    #[serde(default = "default_mcf_template")]
    pub mcf_template: String,

    /// Fields that get category-path normalization and keyword dedup.
    #[serde(default = "default_sanitize_fields", deserialize_with = "comma_list")]
    pub sanitize_fields: Vec<String>,

    /// Optional scalar fields copied verbatim from `NC_GLOBAL`.
    #[serde(default = "default_opt_rec_variables", deserialize_with = "comma_list")]
    pub opt_rec_variables: Vec<String>,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            mcf_template: default_mcf_template(),
            sanitize_fields: default_sanitize_fields(),
            opt_rec_variables: default_opt_rec_variables(),
        }
    }
}

fn default_mcf_template() -> String {
    "mcf/template.yml".into()
}
fn default_sanitize_fields() -> Vec<String> {
    vec!["keywords".into()]
}
fn default_opt_rec_variables() -> Vec<String> {
    vec!["keywords".into(), "institution".into()]
}

/// `[filter]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterConfig {
    /// When non-empty, harvest only these dataset ids.
    #[serde(default, deserialize_with = "comma_list")]
    pub include: Vec<String>,

    /// Dataset ids to drop from the catalog.
    #[serde(default, deserialize_with = "comma_list")]
    pub exclude: Vec<String>,
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving one YAML file per dataset.
    #[serde(default = "default_target_dir")]
    pub target_dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            target_dir: default_target_dir(),
        }
    }
}

fn default_target_dir() -> String {
    "out".into()
}

/// `[generator]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Executable to run.
    pub command: String,
    /// Arguments placed before the YAML path.
    #[serde(default)]
    pub args: Vec<String>,
}

/// Accept either a TOML array or a single comma-separated string.
fn comma_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ListOrJoined {
        List(Vec<String>),
        Joined(String),
    }

    let items = match ListOrJoined::deserialize(deserializer)? {
        ListOrJoined::List(items) => items,
        ListOrJoined::Joined(joined) => joined.split(',').map(String::from).collect(),
    };

    Ok(items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect())
}

// ---------------------------------------------------------------------------
// Harvest config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime harvest configuration — merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    /// ERDDAP base endpoint without a trailing slash.
    pub server: String,
    /// `tabledap` or `griddap`.
    pub protocol: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Skip TLS verification.
    pub accept_invalid_certs: bool,
    /// MCF skeleton path.
    pub template_path: PathBuf,
    /// Fields that get keyword sanitizing.
    pub sanitize_fields: Vec<String>,
    /// Optional fields copied verbatim.
    pub opt_rec_variables: Vec<String>,
    /// Dataset ids to keep (empty = all).
    pub include: Vec<String>,
    /// Dataset ids to drop.
    pub exclude: Vec<String>,
    /// Output directory.
    pub target_dir: PathBuf,
    /// External XML generator.
    pub generator: Option<GeneratorConfig>,
}

impl From<&AppConfig> for HarvestConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            server: config.erddap.erddap_server.trim_end_matches('/').to_string(),
            protocol: config.erddap.erddap_protocol.clone(),
            timeout_secs: config.erddap.timeout_secs,
            accept_invalid_certs: config.erddap.accept_invalid_certs,
            template_path: PathBuf::from(&config.template.mcf_template),
            sanitize_fields: config.template.sanitize_fields.clone(),
            opt_rec_variables: config.template.opt_rec_variables.clone(),
            include: config.filter.include.clone(),
            exclude: config.filter.exclude.clone(),
            target_dir: PathBuf::from(&config.output.target_dir),
            generator: config.generator.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.erddap-iso/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| HarvestError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.erddap-iso/erddap-iso.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| HarvestError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| HarvestError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| HarvestError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| HarvestError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| HarvestError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Check that an ERDDAP endpoint is configured and looks like a URL.
pub fn validate_server(config: &AppConfig) -> Result<()> {
    let server = config.erddap.erddap_server.trim();
    if server.is_empty() {
        return Err(HarvestError::config(
            "erddap_server is not set. Add it under [erddap] in the config file.",
        ));
    }

    url::Url::parse(server)
        .map(|_| ())
        .map_err(|e| HarvestError::config(format!("erddap_server '{server}' is not a URL: {e}")))
}
