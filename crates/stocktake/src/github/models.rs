use serde::Deserialize;

pub mod page;
pub use page::Page;

// -------------------------------------------------------------------------------------------------
// ClientError
// -------------------------------------------------------------------------------------------------
/// The error body GitHub attaches to non-2xx REST responses.
#[derive(Debug, Deserialize)]
pub struct ClientError {
    pub message: String,
    pub documentation_url: Option<String>,
}

// -------------------------------------------------------------------------------------------------
// RateLimit
// -------------------------------------------------------------------------------------------------
#[derive(Debug, Deserialize)]
pub struct RateLimitOverview {
    pub resources: Resources,
    pub rate: Rate,
}

#[derive(Debug, Deserialize)]
pub struct Resources {
    pub core: Rate,
    pub graphql: Option<Rate>,
}

#[derive(Debug, Deserialize)]
pub struct Rate {
    pub limit: i64,
    pub remaining: i64,
    pub reset: i64,
    pub used: i64,
}

// -------------------------------------------------------------------------------------------------
// REST enrichment endpoints
//
// Each endpoint gets its own schema; only the fields the inventory consumes are listed, and
// counts default to zero when the server omits them.
// -------------------------------------------------------------------------------------------------
/// `GET /repos/{owner}/{repo}`; only the size (in KB) is consumed.
#[derive(Debug, Deserialize)]
pub struct RepoDetails {
    #[serde(default)]
    pub size: i64,
}

/// `GET /repos/{owner}/{repo}/actions/workflows`
#[derive(Debug, Deserialize)]
pub struct WorkflowList {
    #[serde(default)]
    pub total_count: i64,
}

/// `GET /{orgs,repos}/{...}/actions/runners`
#[derive(Debug, Deserialize)]
pub struct RunnerList {
    #[serde(default)]
    pub total_count: i64,
}

/// `GET /orgs/{org}/actions/hosted-runners`
#[derive(Debug, Deserialize)]
pub struct HostedRunnerList {
    #[serde(default)]
    pub total_count: i64,
}

/// `GET /orgs/{org}/installations`
#[derive(Debug, Deserialize)]
pub struct InstallationList {
    #[serde(default)]
    pub total_count: i64,
}

/// An element of `GET /orgs/{org}/hooks` or `GET /repos/{owner}/{repo}/hooks`; hooks are counted,
/// not inspected.
#[derive(Debug, Deserialize)]
pub struct Webhook {
    pub id: i64,
}

/// An element of `GET /orgs/{org}/teams`; teams are counted, not inspected.
#[derive(Debug, Deserialize)]
pub struct Team {
    pub id: i64,
}

// -------------------------------------------------------------------------------------------------
// GraphQL envelopes
// -------------------------------------------------------------------------------------------------
#[derive(Debug, Deserialize)]
pub struct GraphQlEnvelope<T> {
    pub data: Option<T>,
    pub errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
pub struct GraphQlError {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

// -------------------------------------------------------------------------------------------------
// Enterprise organization listing
// -------------------------------------------------------------------------------------------------
#[derive(Debug, Deserialize)]
pub struct EnterpriseData {
    pub enterprise: Option<EnterpriseOrganizations>,
}

#[derive(Debug, Deserialize)]
pub struct EnterpriseOrganizations {
    pub organizations: OrganizationConnection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationConnection {
    pub page_info: PageInfo,
    /// Access-restricted organizations come back as `null` nodes and are filtered by the caller.
    pub nodes: Vec<Option<OrganizationNode>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationNode {
    pub login: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub url: String,
    pub created_at: String,
}

// -------------------------------------------------------------------------------------------------
// Organization repository listing
// -------------------------------------------------------------------------------------------------
#[derive(Debug, Deserialize)]
pub struct OrganizationData {
    pub organization: Option<OrganizationRepositories>,
}

#[derive(Debug, Deserialize)]
pub struct OrganizationRepositories {
    pub repositories: RepositoryConnection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryConnection {
    pub page_info: PageInfo,
    pub nodes: Vec<Option<RepositoryNode>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryNode {
    pub name: String,
    pub name_with_owner: String,
    pub description: Option<String>,
    pub url: String,
    /// `PRIVATE`, `INTERNAL`, or `PUBLIC`; authoritative over the derived booleans below.
    pub visibility: Option<String>,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub is_fork: bool,
    #[serde(default)]
    pub is_archived: bool,
    pub created_at: String,
    pub updated_at: String,
    pub pushed_at: Option<String>,
    pub default_branch_ref: Option<BranchRef>,
    #[serde(default)]
    pub fork_count: i64,
    #[serde(default)]
    pub issues: CountField,
    #[serde(default)]
    pub pull_requests: CountField,
    #[serde(default)]
    pub releases: CountField,
    #[serde(default)]
    pub branches: CountField,
    #[serde(default)]
    pub tags: CountField,
}

#[derive(Debug, Deserialize)]
pub struct BranchRef {
    pub name: String,
}

/// A GraphQL `{ totalCount }` sub-selection.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountField {
    #[serde(default)]
    pub total_count: i64,
}
