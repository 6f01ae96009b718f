use anyhow::{Context, Result};
use indicatif::HumanCount;
use tracing::info;

use stocktake::inventory::{self, InventoryConfig, RunSummary};

use crate::args::{GlobalArgs, InventoryArgs, SummaryOutputFormat};
use crate::reportable::Reportable;
use crate::util::Counted;

pub fn run(global_args: &GlobalArgs, args: &InventoryArgs) -> Result<()> {
    for path in [&args.repo_report, &args.org_report] {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create output directory {}", parent.display())
                })?;
            }
        }
    }

    let config = InventoryConfig {
        enterprise: args.enterprise.clone(),
        rest_url: args.github_api_url.clone(),
        graphql_url: args.github_graphql_url.clone(),
        ignore_certs: args.ignore_certs,
        max_organizations: (args.max_orgs > 0).then_some(args.max_orgs),
        repo_report_path: args.repo_report.clone(),
        org_report_path: args.org_report.clone(),
        progress_enabled: global_args.use_progress(),
    };

    let summary = inventory::run(config)
        .with_context(|| format!("Failed to inventory enterprise {}", args.enterprise))?;

    info!(
        "Inventory complete: {} across {}",
        Counted::new(summary.repositories, "repository", "repositories"),
        Counted::regular(summary.organizations, "organization"),
    );
    info!("Repository report: {}", args.repo_report.display());
    info!("Organization report: {}", args.org_report.display());

    let output = args
        .output_args
        .get_writer()
        .context("Failed to get output writer")?;
    SummaryReporter(summary).report(args.output_args.format, output)
}

struct SummaryReporter(RunSummary);

impl Reportable for SummaryReporter {
    type Format = SummaryOutputFormat;

    fn report<W: std::io::Write>(&self, format: Self::Format, mut writer: W) -> Result<()> {
        match format {
            SummaryOutputFormat::Human => {
                writeln!(writer)?;
                summary_table(&self.0).print(&mut writer)?;
                Ok(())
            }

            SummaryOutputFormat::Json => {
                serde_json::to_writer_pretty(writer, &self.0)?;
                Ok(())
            }
        }
    }
}

fn summary_table(summary: &RunSummary) -> prettytable::Table {
    use prettytable::format::{FormatBuilder, LinePosition, LineSeparator};
    use prettytable::row;

    let f = FormatBuilder::new()
        .column_separator(' ')
        .separators(&[LinePosition::Title], LineSeparator::new('─', '─', '─', '─'))
        .padding(1, 1)
        .build();

    let mut table = prettytable::Table::new();
    table.set_format(f);
    table.set_titles(row![lb -> "Inventory Summary", cb -> "Count"]);
    table.add_row(row![l -> "Organizations", r -> HumanCount(summary.organizations)]);
    table.add_row(row![l -> "Repositories", r -> HumanCount(summary.repositories)]);
    table.add_row(row![l -> "  Private", r -> HumanCount(summary.private_repositories)]);
    table.add_row(row![l -> "  Internal", r -> HumanCount(summary.internal_repositories)]);
    table.add_row(row![l -> "  Public", r -> HumanCount(summary.public_repositories)]);
    table.add_row(row![l -> "  Archived", r -> HumanCount(summary.archived_repositories)]);
    table.add_row(row![l -> "  Forks", r -> HumanCount(summary.fork_repositories)]);
    table.add_row(row![l -> "Branches", r -> HumanCount(summary.branches)]);
    table.add_row(row![l -> "Workflows", r -> HumanCount(summary.workflows)]);
    table.add_row(row![l -> "Webhooks", r -> HumanCount(summary.webhooks)]);
    table.add_row(row![l -> "GitHub Apps", r -> HumanCount(summary.github_apps)]);
    table.add_row(row![l -> "Pull Requests", r -> HumanCount(summary.pull_requests)]);
    table.add_row(row![l -> "Open Issues", r -> HumanCount(summary.open_issues)]);
    table
}
