use serde::Serialize;
use tracing::warn;

use crate::github::{OrganizationNode, RepositoryNode};

// -------------------------------------------------------------------------------------------------
// Visibility
// -------------------------------------------------------------------------------------------------
/// A repository is exactly one of private, internal, or public.
///
/// The GraphQL `visibility` field is authoritative; the derived `isPrivate` boolean only decides
/// when the field is absent. Disagreements between the two are logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Private,
    Internal,
    Public,
}

impl Visibility {
    pub fn resolve(visibility: Option<&str>, is_private: bool, repo: &str) -> Visibility {
        let explicit = match visibility {
            Some(v) => match v.to_ascii_uppercase().as_str() {
                "PRIVATE" => Some(Visibility::Private),
                "INTERNAL" => Some(Visibility::Internal),
                "PUBLIC" => Some(Visibility::Public),
                other => {
                    warn!("Repository {repo} has unrecognized visibility {other:?}");
                    None
                }
            },
            None => None,
        };

        match explicit {
            Some(resolved) => {
                let derived_private = resolved != Visibility::Public;
                if derived_private != is_private && resolved != Visibility::Internal {
                    warn!(
                        "Repository {repo} reports visibility {resolved:?} but isPrivate={is_private}; using the visibility field"
                    );
                }
                resolved
            }
            None => {
                if is_private {
                    Visibility::Private
                } else {
                    Visibility::Public
                }
            }
        }
    }
}

// -------------------------------------------------------------------------------------------------
// RepoRecord
// -------------------------------------------------------------------------------------------------
pub const REPO_COLUMNS: [&str; 24] = [
    "Organization",
    "Repository",
    "Description",
    "URL",
    "Is_Private",
    "Is_Internal",
    "Is_Public",
    "Is_Fork",
    "Is_Archived",
    "Created_At",
    "Updated_At",
    "Pushed_At",
    "Size_KB",
    "Default_Branch",
    "Forks",
    "Open_Issues",
    "Pull_Requests",
    "Releases",
    "Branches",
    "Tags",
    "Workflows",
    "Repo_Webhooks",
    "Repo_Runners",
    "GitHub_Apps",
];

/// One row of the repository report. Field order matches `REPO_COLUMNS`.
#[derive(Debug, Serialize)]
pub struct RepoRecord {
    pub organization: String,
    pub repository: String,
    pub description: String,
    pub url: String,
    pub is_private: bool,
    pub is_internal: bool,
    pub is_public: bool,
    pub is_fork: bool,
    pub is_archived: bool,
    pub created_at: String,
    pub updated_at: String,
    pub pushed_at: String,
    pub size_kb: i64,
    pub default_branch: String,
    pub forks: i64,
    pub open_issues: i64,
    pub pull_requests: i64,
    pub releases: i64,
    pub branches: i64,
    pub tags: i64,
    pub workflows: i64,
    pub repo_webhooks: i64,
    pub repo_runners: i64,
    pub github_apps: i64,
}

/// REST-sourced metadata joined onto a repository listing node.
#[derive(Debug, Default)]
pub struct RepoEnrichment {
    pub size_kb: i64,
    pub workflows: i64,
    pub webhooks: i64,
    pub runners: i64,
    pub apps: i64,
}

impl RepoRecord {
    pub fn assemble(org_login: &str, node: RepositoryNode, enrichment: RepoEnrichment) -> Self {
        let visibility = Visibility::resolve(
            node.visibility.as_deref(),
            node.is_private,
            &node.name_with_owner,
        );
        RepoRecord {
            organization: org_login.to_string(),
            repository: node.name,
            description: node.description.unwrap_or_default(),
            url: node.url,
            is_private: visibility == Visibility::Private,
            is_internal: visibility == Visibility::Internal,
            is_public: visibility == Visibility::Public,
            is_fork: node.is_fork,
            is_archived: node.is_archived,
            created_at: node.created_at,
            updated_at: node.updated_at,
            pushed_at: node.pushed_at.unwrap_or_default(),
            size_kb: enrichment.size_kb,
            default_branch: node.default_branch_ref.map(|r| r.name).unwrap_or_default(),
            forks: node.fork_count,
            open_issues: node.issues.total_count,
            pull_requests: node.pull_requests.total_count,
            releases: node.releases.total_count,
            branches: node.branches.total_count,
            tags: node.tags.total_count,
            workflows: enrichment.workflows,
            repo_webhooks: enrichment.webhooks,
            repo_runners: enrichment.runners,
            github_apps: enrichment.apps,
        }
    }
}

// -------------------------------------------------------------------------------------------------
// OrgRecord
// -------------------------------------------------------------------------------------------------
pub const ORG_COLUMNS: [&str; 15] = [
    "Organization",
    "Description",
    "URL",
    "Created_At",
    "Total_Repositories",
    "Private_Repositories",
    "Public_Repositories",
    "Internal_Repositories",
    "Archived_Repositories",
    "Fork_Repositories",
    "Org_Webhooks",
    "Org_GitHub_Apps",
    "Org_Teams",
    "Org_Runners_SelfHosted",
    "Org_Runners_GitHubHosted",
];

/// One row of the organization report. Field order matches `ORG_COLUMNS`.
#[derive(Debug, Serialize)]
pub struct OrgRecord {
    pub organization: String,
    pub description: String,
    pub url: String,
    pub created_at: String,
    pub total_repositories: i64,
    pub private_repositories: i64,
    pub public_repositories: i64,
    pub internal_repositories: i64,
    pub archived_repositories: i64,
    pub fork_repositories: i64,
    pub org_webhooks: i64,
    pub org_github_apps: i64,
    pub org_teams: i64,
    pub org_runners_self_hosted: i64,
    pub org_runners_github_hosted: i64,
}

/// Per-organization repository counters, accumulated while repository rows stream past.
#[derive(Debug, Default)]
pub struct OrgStats {
    pub total: i64,
    pub private: i64,
    pub public: i64,
    pub internal: i64,
    pub archived: i64,
    pub fork: i64,
}

impl OrgStats {
    pub fn add(&mut self, record: &RepoRecord) {
        self.total += 1;
        if record.is_private {
            self.private += 1;
        }
        if record.is_public {
            self.public += 1;
        }
        if record.is_internal {
            self.internal += 1;
        }
        if record.is_archived {
            self.archived += 1;
        }
        if record.is_fork {
            self.fork += 1;
        }
    }
}

/// Organization-level counts fetched ahead of the repository sweep.
#[derive(Debug, Default)]
pub struct OrgEnrichment {
    pub webhooks: i64,
    pub apps: i64,
    pub teams: i64,
    pub runners_self_hosted: i64,
    pub runners_hosted: i64,
}

impl OrgRecord {
    pub fn assemble(org: &OrganizationNode, stats: OrgStats, enrichment: OrgEnrichment) -> Self {
        OrgRecord {
            organization: org.login.clone(),
            description: org.description.clone().unwrap_or_default(),
            url: org.url.clone(),
            created_at: org.created_at.clone(),
            total_repositories: stats.total,
            private_repositories: stats.private,
            public_repositories: stats.public,
            internal_repositories: stats.internal,
            archived_repositories: stats.archived,
            fork_repositories: stats.fork,
            org_webhooks: enrichment.webhooks,
            org_github_apps: enrichment.apps,
            org_teams: enrichment.teams,
            org_runners_self_hosted: enrichment.runners_self_hosted,
            org_runners_github_hosted: enrichment.runners_hosted,
        }
    }
}
