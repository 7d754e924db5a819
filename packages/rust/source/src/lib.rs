//! ERDDAP metadata source.
//!
//! Fetches the public dataset catalog (`allDatasets`) and each dataset's
//! flat attribute table (`info/<id>/index.csv`) from an ERDDAP server and
//! decodes them into shared domain types. The harvest pipeline talks to the
//! server only through the [`MetadataSource`] trait.

mod parser;

use std::time::Duration;

use erddap_iso_shared::{AttributeTable, CatalogRow, HarvestConfig, HarvestError, Result};
use reqwest::Client;
use tracing::{debug, info, instrument};
use url::Url;

/// Maximum number of redirects to follow.
const MAX_REDIRECTS: usize = 5;

/// Default timeout in seconds for ERDDAP requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// User-Agent string for ERDDAP requests.
const USER_AGENT: &str = concat!("erddap-iso/", env!("CARGO_PKG_VERSION"));

/// Catalog columns requested from `allDatasets`.
///
/// `date_published` is not a standard `allDatasets` column, so it is never
/// requested; the catalog decoder still picks it up when a server's response
/// carries one, and the explicit date then takes precedence over `minTime`.
const CATALOG_COLUMNS: &[&str] = &[
    "datasetID",
    "accessible",
    "dataStructure",
    "tabledap",
    "griddap",
    "infoUrl",
    "sourceUrl",
    "minLongitude",
    "minLatitude",
    "maxLongitude",
    "maxLatitude",
    "minTime",
    "maxTime",
];

// ---------------------------------------------------------------------------
// MetadataSource
// ---------------------------------------------------------------------------

/// Anything that can list datasets and return their attribute tables.
#[allow(async_fn_in_trait)]
pub trait MetadataSource {
    /// All catalog rows, including the synthetic `allDatasets` row.
    async fn fetch_catalog(&self) -> Result<Vec<CatalogRow>>;

    /// The attribute table for one dataset.
    async fn fetch_attributes(&self, dataset_id: &str) -> Result<AttributeTable>;
}

// ---------------------------------------------------------------------------
// Source options
// ---------------------------------------------------------------------------

/// Connection settings for an ERDDAP server.
#[derive(Debug, Clone)]
pub struct SourceOptions {
    /// Base endpoint, e.g. `https://example.org/erddap`.
    pub server: String,
    /// Timeout for HTTP requests in seconds.
    pub timeout_secs: u64,
    /// Skip TLS certificate verification.
    pub accept_invalid_certs: bool,
}

impl SourceOptions {
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            accept_invalid_certs: false,
        }
    }
}

impl From<&HarvestConfig> for SourceOptions {
    fn from(config: &HarvestConfig) -> Self {
        Self {
            server: config.server.clone(),
            timeout_secs: config.timeout_secs,
            accept_invalid_certs: config.accept_invalid_certs,
        }
    }
}

// ---------------------------------------------------------------------------
// ErddapSource
// ---------------------------------------------------------------------------

/// HTTP-backed [`MetadataSource`] for a single ERDDAP server.
pub struct ErddapSource {
    client: Client,
    server: Url,
}

impl ErddapSource {
    /// Build a source for the given server.
    pub fn new(opts: &SourceOptions) -> Result<Self> {
        let trimmed = opts.server.trim().trim_end_matches('/');
        let server = Url::parse(&format!("{trimmed}/")).map_err(|e| {
            HarvestError::config(format!("invalid ERDDAP server '{}': {e}", opts.server))
        })?;

        Ok(Self {
            client: build_client(opts)?,
            server,
        })
    }

    /// URL of the public catalog listing.
    pub fn catalog_url(&self) -> Result<Url> {
        let mut url = self.join("tabledap/allDatasets.csvp")?;
        // ERDDAP expects the column list as a bare query prefix.
        let query = format!("{}&accessible=%22public%22", CATALOG_COLUMNS.join(","));
        url.set_query(Some(&query));
        Ok(url)
    }

    /// URL of one dataset's attribute table.
    pub fn attributes_url(&self, dataset_id: &str) -> Result<Url> {
        self.join(&format!("info/{dataset_id}/index.csv"))
    }

    fn join(&self, path: &str) -> Result<Url> {
        self.server
            .join(path)
            .map_err(|e| HarvestError::config(format!("cannot build URL for {path}: {e}")))
    }
}

impl MetadataSource for ErddapSource {
    #[instrument(skip_all, fields(server = %self.server))]
    async fn fetch_catalog(&self) -> Result<Vec<CatalogRow>> {
        let url = self.catalog_url()?;
        info!(%url, "fetching dataset catalog");

        let body = fetch_text(&self.client, &url).await?;
        let rows = parser::parse_catalog_csv(&body)?;

        info!(rows = rows.len(), "catalog fetched");
        Ok(rows)
    }

    #[instrument(skip_all, fields(dataset_id = %dataset_id))]
    async fn fetch_attributes(&self, dataset_id: &str) -> Result<AttributeTable> {
        let url = self.attributes_url(dataset_id)?;
        debug!(%url, "fetching attribute table");

        let body = fetch_text(&self.client, &url).await?;
        let table = parser::parse_attribute_csv(&body)?;

        debug!(rows = table.len(), "attribute table fetched");
        Ok(table)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build a reqwest client with appropriate settings.
fn build_client(opts: &SourceOptions) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .timeout(Duration::from_secs(opts.timeout_secs))
        .danger_accept_invalid_certs(opts.accept_invalid_certs)
        .build()
        .map_err(|e| HarvestError::Network(format!("failed to build HTTP client: {e}")))
}

/// GET a URL and return the body, failing on non-2xx status.
async fn fetch_text(client: &Client, url: &Url) -> Result<String> {
    let response = client
        .get(url.as_str())
        .send()
        .await
        .map_err(|e| HarvestError::Network(format!("{url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(HarvestError::Network(format!("{url}: HTTP {status}")));
    }

    response
        .text()
        .await
        .map_err(|e| HarvestError::Network(format!("{url}: failed to read body: {e}")))
}
