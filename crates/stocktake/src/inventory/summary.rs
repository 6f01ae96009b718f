use serde::Serialize;

use super::records::RepoRecord;

// -------------------------------------------------------------------------------------------------
// RunSummary
// -------------------------------------------------------------------------------------------------
/// Grand totals across the whole run, for the end-of-run report.
#[derive(Debug, Default, Serialize)]
pub struct RunSummary {
    pub organizations: u64,
    pub repositories: u64,
    pub private_repositories: u64,
    pub internal_repositories: u64,
    pub public_repositories: u64,
    pub archived_repositories: u64,
    pub fork_repositories: u64,
    pub branches: u64,
    pub workflows: u64,
    pub webhooks: u64,
    pub github_apps: u64,
    pub pull_requests: u64,
    pub open_issues: u64,
}

impl RunSummary {
    pub fn add_repo(&mut self, record: &RepoRecord) {
        self.repositories += 1;
        if record.is_private {
            self.private_repositories += 1;
        }
        if record.is_internal {
            self.internal_repositories += 1;
        }
        if record.is_public {
            self.public_repositories += 1;
        }
        if record.is_archived {
            self.archived_repositories += 1;
        }
        if record.is_fork {
            self.fork_repositories += 1;
        }
        self.branches += record.branches.max(0) as u64;
        self.workflows += record.workflows.max(0) as u64;
        self.webhooks += record.repo_webhooks.max(0) as u64;
        self.github_apps += record.github_apps.max(0) as u64;
        self.pull_requests += record.pull_requests.max(0) as u64;
        self.open_issues += record.open_issues.max(0) as u64;
    }
}
