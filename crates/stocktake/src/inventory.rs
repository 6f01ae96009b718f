use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{debug, info};
use url::Url;

mod collector;
mod records;
mod summary;

pub use collector::InventoryCollector;
pub use records::{OrgRecord, RepoRecord, Visibility, ORG_COLUMNS, REPO_COLUMNS};
pub use summary::RunSummary;

use crate::github::ClientBuilder;
use crate::report::ReportWriter;

/// Everything needed to drive one inventory run.
///
/// Credentials are not carried here; they are loaded from the `ST_GITHUB_TOKENS` environment
/// variable when the client is built.
#[derive(Debug)]
pub struct InventoryConfig {
    pub enterprise: String,
    pub rest_url: Url,
    pub graphql_url: Url,
    pub ignore_certs: bool,
    /// Process at most this many organizations; `None` means all of them.
    pub max_organizations: Option<usize>,
    pub repo_report_path: PathBuf,
    pub org_report_path: PathBuf,
    pub progress_enabled: bool,
}

/// Inventory an enterprise, writing both CSV reports incrementally.
///
/// This is a high-level wrapper that handles the details of creating an async runtime and a
/// GitHub API client.
pub fn run(config: InventoryConfig) -> Result<RunSummary> {
    let client = ClientBuilder::new()
        .rest_url(config.rest_url.clone())
        .context("Failed to set REST API URL")?
        .graphql_url(config.graphql_url.clone())
        .context("Failed to set GraphQL API URL")?
        .tokens_from_env()
        .with_context(|| {
            format!("Failed to load access tokens from {}", ClientBuilder::TOKENS_ENV_VAR)
        })?
        .ignore_certs(config.ignore_certs)
        .build()
        .with_context(|| {
            format!(
                "Failed to initialize GitHub client; set {} to a comma-separated list of personal access tokens",
                ClientBuilder::TOKENS_ENV_VAR
            )
        })?;
    info!("Using {} access token(s) in rotation", client.token_count());

    let mut repo_report = ReportWriter::create(&config.repo_report_path, &REPO_COLUMNS)
        .with_context(|| {
            format!("Failed to create repository report at {}", config.repo_report_path.display())
        })?;
    let mut org_report = ReportWriter::create(&config.org_report_path, &ORG_COLUMNS)
        .with_context(|| {
            format!("Failed to create organization report at {}", config.org_report_path.display())
        })?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to initialize async runtime")?;

    runtime.block_on(async {
        // Query rate limits first thing: if there are connectivity or credential problems, this
        // reveals them before any report rows are written.
        let rate_limit = client
            .get_rate_limit()
            .await
            .context("Failed to query rate limits; check connectivity and credentials")?;
        debug!(
            "Rate limits: core {}/{} remaining",
            rate_limit.rate.remaining, rate_limit.rate.limit
        );

        let collector = InventoryCollector::new(&client);
        collector
            .collect(
                &config.enterprise,
                config.max_organizations,
                &mut repo_report,
                &mut org_report,
                config.progress_enabled,
            )
            .await
    })
}
