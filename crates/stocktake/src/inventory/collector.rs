use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info, warn};

use crate::github::{Client, OrganizationNode, RepositoryNode};
use crate::report::ReportWriter;

use super::records::{OrgEnrichment, OrgRecord, OrgStats, RepoEnrichment, RepoRecord};
use super::summary::RunSummary;

// -------------------------------------------------------------------------------------------------
// InventoryCollector
// -------------------------------------------------------------------------------------------------
/// Drives the full enterprise traversal: all organizations, then per-organization all
/// repositories, enriching each entity and flushing report rows as soon as they are assembled.
///
/// Field-level enrichment failures are downgraded to warnings and safe defaults; only the
/// top-level listing calls can end a traversal early.
pub struct InventoryCollector<'c> {
    client: &'c Client,
}

impl<'c> InventoryCollector<'c> {
    pub fn new(client: &'c Client) -> Self {
        Self { client }
    }

    /// Inventory the enterprise, writing rows through the given report writers.
    ///
    /// When `max_organizations` is set, only the first N organizations in listing order are
    /// processed.
    pub async fn collect(
        &self,
        enterprise: &str,
        max_organizations: Option<usize>,
        repo_report: &mut ReportWriter,
        org_report: &mut ReportWriter,
        progress_enabled: bool,
    ) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        let organizations = self
            .list_organizations(enterprise, max_organizations)
            .await
            .with_context(|| format!("Failed to list organizations of enterprise {enterprise}"))?;
        info!("Found {} organization(s) in enterprise {enterprise}", organizations.len());

        let progress = spinner(progress_enabled);
        let total_orgs = organizations.len();

        for (index, org) in organizations.iter().enumerate() {
            info!("Processing organization {}/{}: {}", index + 1, total_orgs, org.login);
            progress.set_message(format!("{} ({}/{})", org.login, index + 1, total_orgs));

            let enrichment = self.enrich_organization(org).await;

            let mut stats = OrgStats::default();
            match self
                .process_repositories(org, repo_report, &mut stats, &mut summary, &progress)
                .await?
            {
                RepoSweep::Complete => {}
                RepoSweep::ListingFailed => {
                    // Already logged; no organization row for a partially listed organization.
                    continue;
                }
            }

            let record = OrgRecord::assemble(org, stats, enrichment);
            org_report
                .write_row(&record)
                .with_context(|| format!("Failed to write organization row for {}", org.login))?;
            summary.organizations += 1;
            info!(
                "Completed organization {}: {} repositories",
                org.login, record.total_repositories
            );
        }

        progress.finish_and_clear();
        Ok(summary)
    }

    /// Drain the enterprise's organization listing, up to the configured cap.
    ///
    /// Restricted organizations come back as `null` nodes; they are skipped with a warning.
    async fn list_organizations(
        &self,
        enterprise: &str,
        max_organizations: Option<usize>,
    ) -> crate::github::Result<Vec<OrganizationNode>> {
        let mut organizations = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let page = self
                .client
                .enterprise_organizations_page(enterprise, cursor.as_deref())
                .await?;

            let restricted = page.nodes.iter().filter(|n| n.is_none()).count();
            if restricted > 0 {
                warn!("Skipping {restricted} access-restricted organization(s)");
            }
            organizations.extend(page.nodes.into_iter().flatten());

            if let Some(cap) = max_organizations {
                if organizations.len() >= cap {
                    organizations.truncate(cap);
                    warn!("Processing only the first {cap} organization(s)");
                    break;
                }
            }
            if !page.page_info.has_next_page {
                break;
            }
            cursor = page.page_info.end_cursor;
        }

        Ok(organizations)
    }

    async fn enrich_organization(&self, org: &OrganizationNode) -> OrgEnrichment {
        let login = org.login.as_str();
        OrgEnrichment {
            webhooks: soft_count(self.client.org_webhook_count(login).await, login, "webhooks"),
            apps: soft_count(self.client.org_app_count(login).await, login, "app installations"),
            teams: soft_count(self.client.org_team_count(login).await, login, "teams"),
            runners_self_hosted: soft_count(
                self.client.org_self_hosted_runner_count(login).await,
                login,
                "self-hosted runners",
            ),
            runners_hosted: soft_count(
                self.client.org_hosted_runner_count(login).await,
                login,
                "hosted runners",
            ),
        }
    }

    async fn process_repositories(
        &self,
        org: &OrganizationNode,
        repo_report: &mut ReportWriter,
        stats: &mut OrgStats,
        summary: &mut RunSummary,
        progress: &ProgressBar,
    ) -> Result<RepoSweep> {
        let mut cursor: Option<String> = None;

        loop {
            let page = match self
                .client
                .organization_repositories_page(&org.login, cursor.as_deref())
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    error!(
                        "Failed to list repositories of organization {}: {e}; skipping this organization",
                        org.login
                    );
                    return Ok(RepoSweep::ListingFailed);
                }
            };

            for node in page.nodes.into_iter().flatten() {
                let record = self.assemble_repository(&org.login, node).await;
                repo_report.write_row(&record).with_context(|| {
                    format!("Failed to write repository row for {}/{}", org.login, record.repository)
                })?;
                stats.add(&record);
                summary.add_repo(&record);
                progress.inc(1);
            }

            if !page.page_info.has_next_page {
                return Ok(RepoSweep::Complete);
            }
            cursor = page.page_info.end_cursor;
        }
    }

    /// Join the REST enrichment calls onto a repository listing node.
    ///
    /// Each fetch fails independently; a failed field becomes its zero value.
    //
    // TODO: issue the five enrichment fetches concurrently; the token pool already serializes
    // quota bookkeeping, so this only needs a join on the futures.
    async fn assemble_repository(&self, org_login: &str, node: RepositoryNode) -> RepoRecord {
        let (owner, name) = node
            .name_with_owner
            .split_once('/')
            .unwrap_or((org_login, node.name.as_str()));
        let scope = node.name_with_owner.clone();

        let enrichment = RepoEnrichment {
            size_kb: soft_count(self.client.repo_size_kb(owner, name).await, &scope, "size"),
            workflows: soft_count(
                self.client.repo_workflow_count(owner, name).await,
                &scope,
                "workflows",
            ),
            webhooks: soft_count(
                self.client.repo_webhook_count(owner, name).await,
                &scope,
                "webhooks",
            ),
            runners: soft_count(
                self.client.repo_runner_count(owner, name).await,
                &scope,
                "runners",
            ),
            apps: match self.client.repo_has_installation(owner, name).await {
                Ok(true) => 1,
                Ok(false) => 0,
                Err(e) => {
                    warn!("Could not fetch app installation for {scope}: {e}");
                    0
                }
            },
        };

        RepoRecord::assemble(org_login, node, enrichment)
    }
}

enum RepoSweep {
    Complete,
    ListingFailed,
}

/// Downgrade a failed count fetch to its zero value, with enough context to triage later.
fn soft_count(result: crate::github::Result<i64>, scope: &str, field: &str) -> i64 {
    match result {
        Ok(n) => n,
        Err(e) => {
            warn!("Could not fetch {field} for {scope}: {e}");
            0
        }
    }
}

fn spinner(enabled: bool) -> ProgressBar {
    if enabled {
        let style = ProgressStyle::with_template("{spinner} {msg} {human_pos} repositories [{elapsed_precise}]")
            .expect("progress style template should compile");
        let bar = ProgressBar::new_spinner().with_style(style);
        bar.enable_steady_tick(std::time::Duration::from_millis(500));
        bar
    } else {
        ProgressBar::hidden()
    }
}
