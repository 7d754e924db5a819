//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use erddap_iso_core::pipeline::{self, HarvestContext, HarvestResult, ProgressReporter};
use erddap_iso_core::reposition::{self, DEFAULT_ADJUST, RepositionOptions};
use erddap_iso_shared::{
    AppConfig, HarvestConfig, init_config, load_config, load_config_from, validate_server,
};
use erddap_iso_source::{ErddapSource, SourceOptions};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// erddap-iso: ERDDAP metadata to ISO 19115-ready records.
#[derive(Parser)]
#[command(
    name = "erddap-iso",
    version,
    about = "Harvest ERDDAP dataset metadata into MCF records for ISO 19115 XML generation.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file (defaults to ~/.erddap-iso/erddap-iso.toml).
    #[arg(short, long, global = true, env = "ERDDAP_ISO_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Harvest the server's public datasets and write one record per dataset.
    Harvest {
        /// Only harvest these dataset ids (comma-separated).
        #[arg(long, value_delimiter = ',')]
        include: Vec<String>,

        /// Skip these dataset ids (comma-separated).
        #[arg(long, value_delimiter = ',')]
        exclude: Vec<String>,

        /// Output directory (overrides `[output] target_dir`).
        #[arg(short, long)]
        target_dir: Option<PathBuf>,
    },

    /// Replace record bounding boxes with boxes around published station positions.
    Reposition {
        /// URL of the stations JSON document.
        #[arg(short, long)]
        url: String,

        /// Half-height of the box in degrees latitude.
        #[arg(long, default_value_t = DEFAULT_ADJUST)]
        lat_adjust: f64,

        /// Half-width of the box in degrees longitude.
        #[arg(long, default_value_t = DEFAULT_ADJUST)]
        lon_adjust: f64,

        /// Directory of written records (overrides `[output] target_dir`).
        #[arg(short, long)]
        target_dir: Option<PathBuf>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "erddap_iso=info",
        1 => "erddap_iso=debug",
        _ => "erddap_iso=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Harvest {
            include,
            exclude,
            target_dir,
        } => cmd_harvest(config_path, include, exclude, target_dir).await,
        Command::Reposition {
            url,
            lat_adjust,
            lon_adjust,
            target_dir,
        } => {
            let options = RepositionOptions {
                lat_adjust,
                lon_adjust,
            };
            cmd_reposition(config_path, &url, options, target_dir).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(config_path).await,
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_harvest(
    config_path: Option<&Path>,
    include: Vec<String>,
    exclude: Vec<String>,
    target_dir: Option<PathBuf>,
) -> Result<()> {
    let app_config = resolve_config(config_path)?;
    validate_server(&app_config)?;

    let mut config = HarvestConfig::from(&app_config);
    if !include.is_empty() {
        config.include = include;
    }
    if !exclude.is_empty() {
        config.exclude = exclude;
    }
    if let Some(dir) = target_dir {
        config.target_dir = dir;
    }

    let source = ErddapSource::new(&SourceOptions::from(&config))?;
    let ctx = HarvestContext::new(&config.server);

    info!(
        run_id = %ctx.run_id,
        server = %config.server,
        protocol = %config.protocol,
        "harvesting ERDDAP metadata"
    );

    let reporter = CliProgress::new();
    let result = pipeline::run_harvest(&ctx, &config, &source, &reporter).await?;

    println!();
    println!("  Harvest complete.");
    println!("  Run:       {}", result.run_id);
    println!("  Datasets:  {}", result.dataset_count);
    println!("  Written:   {}", result.written.len());
    if !result.skipped.is_empty() {
        println!("  Skipped:   {}", result.skipped.join(", "));
    }
    if config.generator.is_some() {
        println!("  XML:       {}", result.generated);
    }
    println!("  Output:    {}", config.target_dir.display());
    println!("  Time:      {:.1}s", result.elapsed.as_secs_f64());
    println!();

    Ok(())
}

async fn cmd_reposition(
    config_path: Option<&Path>,
    url: &str,
    options: RepositionOptions,
    target_dir: Option<PathBuf>,
) -> Result<()> {
    let app_config = resolve_config(config_path)?;
    let config = HarvestConfig::from(&app_config);
    let target_dir = target_dir.unwrap_or(config.target_dir);

    if !target_dir.is_dir() {
        return Err(eyre!(
            "'{}' is not a directory. Run `erddap-iso harvest` first.",
            target_dir.display()
        ));
    }

    info!(url, target_dir = %target_dir.display(), "repositioning station records");

    let stations =
        reposition::fetch_stations(url, Duration::from_secs(config.timeout_secs)).await?;
    let summary = reposition::reposition_dir(&target_dir, &stations, &options)?;

    println!();
    println!("  Updated:   {}", summary.updated.len());
    println!("  Unmatched: {}", summary.unmatched.len());
    if !summary.failed.is_empty() {
        println!("  Failed:    {}", summary.failed.len());
    }
    println!();

    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(style);
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn dataset_done(&self, dataset_id: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Harvested [{current}/{total}] {dataset_id}"));
    }

    fn done(&self, _result: &HarvestResult) {
        self.spinner.finish_and_clear();
    }
}
