use std::time::Duration;

use chrono::Utc;
use indoc::indoc;
use reqwest::{header, header::HeaderValue, StatusCode, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tokio::time::sleep;
use tracing::{debug, warn};

use super::models::{
    ClientError, EnterpriseData, GraphQlEnvelope, HostedRunnerList, InstallationList,
    OrganizationConnection, OrganizationData, Page, RateLimitOverview, RepoDetails,
    RepositoryConnection, RunnerList, Team, Webhook, WorkflowList,
};
use super::token_pool::{Checkout, Lease, TokenPool};
use super::{Error, Result};

// -------------------------------------------------------------------------------------------------
// Client
// -------------------------------------------------------------------------------------------------
/// A GitHub API client that rotates across a pool of credentials.
///
/// Every request is issued with the next usable credential from the pool. Rate-limited responses
/// bench the credential and resubmit with a fresh one; 5xx responses and connection errors are
/// retried with exponential backoff on the same credential; permission and not-found failures are
/// returned immediately.
pub struct Client {
    rest_url: Url,
    graphql_url: Url,
    inner: reqwest::Client,
    pool: TokenPool,
}

const MAX_PER_PAGE: (&str, &str) = ("per_page", "100");

/// Attempts per request for transient (5xx / connection) failures.
const MAX_ATTEMPTS: u32 = 3;

const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);
const RETRY_MAX_DELAY: Duration = Duration::from_secs(10);

impl Client {
    pub(super) fn from_parts(
        rest_url: Url,
        graphql_url: Url,
        inner: reqwest::Client,
        pool: TokenPool,
    ) -> Self {
        Client {
            rest_url,
            graphql_url,
            inner,
            pool,
        }
    }

    /// The number of credentials in rotation.
    pub fn token_count(&self) -> usize {
        self.pool.len()
    }

    pub async fn get_rate_limit(&self) -> Result<RateLimitOverview> {
        let response = self.get(&["rate_limit"]).await?;
        let body = response.json().await?;
        Ok(body)
    }

    // ---------------------------------------------------------------------------------------------
    // GraphQL listings (cursor pagination)
    // ---------------------------------------------------------------------------------------------

    /// Fetch one page of the enterprise's organization listing.
    pub async fn enterprise_organizations_page(
        &self,
        enterprise: &str,
        cursor: Option<&str>,
    ) -> Result<OrganizationConnection> {
        let data: EnterpriseData = self
            .graphql(
                ENTERPRISE_ORGANIZATIONS_QUERY,
                serde_json::json!({ "enterprise": enterprise, "cursor": cursor }),
            )
            .await?;
        match data.enterprise {
            Some(enterprise) => Ok(enterprise.organizations),
            None => Err(Error::NotFound),
        }
    }

    /// Fetch one page of an organization's repository listing.
    pub async fn organization_repositories_page(
        &self,
        org: &str,
        cursor: Option<&str>,
    ) -> Result<RepositoryConnection> {
        let data: OrganizationData = self
            .graphql(
                ORGANIZATION_REPOSITORIES_QUERY,
                serde_json::json!({ "org": org, "cursor": cursor }),
            )
            .await?;
        match data.organization {
            Some(organization) => Ok(organization.repositories),
            None => Err(Error::NotFound),
        }
    }

    // ---------------------------------------------------------------------------------------------
    // REST enrichment (single-shot or Link-header pagination)
    // ---------------------------------------------------------------------------------------------

    pub async fn org_webhook_count(&self, org: &str) -> Result<i64> {
        self.count_paginated::<Webhook>(&["orgs", org, "hooks"]).await
    }

    pub async fn org_team_count(&self, org: &str) -> Result<i64> {
        self.count_paginated::<Team>(&["orgs", org, "teams"]).await
    }

    pub async fn org_app_count(&self, org: &str) -> Result<i64> {
        let response = self.get(&["orgs", org, "installations"]).await?;
        let body: InstallationList = response.json().await?;
        Ok(body.total_count)
    }

    pub async fn org_self_hosted_runner_count(&self, org: &str) -> Result<i64> {
        let response = self
            .get_with_params(&["orgs", org, "actions", "runners"], &[MAX_PER_PAGE])
            .await?;
        let body: RunnerList = response.json().await?;
        Ok(body.total_count)
    }

    /// GitHub-hosted runners are managed at the organization level only.
    pub async fn org_hosted_runner_count(&self, org: &str) -> Result<i64> {
        let response = self
            .get_with_params(&["orgs", org, "actions", "hosted-runners"], &[MAX_PER_PAGE])
            .await?;
        let body: HostedRunnerList = response.json().await?;
        Ok(body.total_count)
    }

    /// Repository size in KB, from the repository detail endpoint.
    pub async fn repo_size_kb(&self, owner: &str, name: &str) -> Result<i64> {
        let response = self.get(&["repos", owner, name]).await?;
        let body: RepoDetails = response.json().await?;
        Ok(body.size)
    }

    pub async fn repo_workflow_count(&self, owner: &str, name: &str) -> Result<i64> {
        let response = self
            .get(&["repos", owner, name, "actions", "workflows"])
            .await?;
        let body: WorkflowList = response.json().await?;
        Ok(body.total_count)
    }

    pub async fn repo_webhook_count(&self, owner: &str, name: &str) -> Result<i64> {
        self.count_paginated::<Webhook>(&["repos", owner, name, "hooks"])
            .await
    }

    /// Self-hosted runners registered directly on the repository.
    pub async fn repo_runner_count(&self, owner: &str, name: &str) -> Result<i64> {
        let response = self
            .get_with_params(&["repos", owner, name, "actions", "runners"], &[MAX_PER_PAGE])
            .await?;
        let body: RunnerList = response.json().await?;
        Ok(body.total_count)
    }

    /// Whether any GitHub App installation covers the repository.
    ///
    /// The installation endpoint answers 404 when no app is installed.
    pub async fn repo_has_installation(&self, owner: &str, name: &str) -> Result<bool> {
        match self.get(&["repos", owner, name, "installation"]).await {
            Ok(_) => Ok(true),
            Err(Error::NotFound) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

// -------------------------------------------------------------------------------------------------
// GraphQL queries
// -------------------------------------------------------------------------------------------------
const ENTERPRISE_ORGANIZATIONS_QUERY: &str = indoc! {r#"
    query($enterprise: String!, $cursor: String) {
      enterprise(slug: $enterprise) {
        organizations(first: 100, after: $cursor) {
          pageInfo {
            hasNextPage
            endCursor
          }
          nodes {
            login
            name
            description
            url
            createdAt
          }
        }
      }
    }
"#};

const ORGANIZATION_REPOSITORIES_QUERY: &str = indoc! {r#"
    query($org: String!, $cursor: String) {
      organization(login: $org) {
        repositories(first: 100, after: $cursor) {
          pageInfo {
            hasNextPage
            endCursor
          }
          nodes {
            name
            nameWithOwner
            description
            url
            visibility
            isPrivate
            isFork
            isArchived
            createdAt
            updatedAt
            pushedAt
            defaultBranchRef {
              name
            }
            forkCount
            issues(states: OPEN) {
              totalCount
            }
            pullRequests {
              totalCount
            }
            releases {
              totalCount
            }
            branches: refs(refPrefix: "refs/heads/", first: 0) {
              totalCount
            }
            tags: refs(refPrefix: "refs/tags/", first: 0) {
              totalCount
            }
          }
        }
      }
    }
"#};

// private implementation
impl Client {
    /// Construct a REST endpoint `Url` from the given path parts and query parameters.
    fn endpoint(&self, path_parts: &[&str], params: &[(&str, &str)]) -> Result<Url> {
        url_from_path_parts(&self.rest_url, path_parts, params)
    }

    async fn get(&self, path_parts: &[&str]) -> Result<reqwest::Response> {
        self.get_with_params(path_parts, &[]).await
    }

    async fn get_with_params(
        &self,
        path_parts: &[&str],
        params: &[(&str, &str)],
    ) -> Result<reqwest::Response> {
        let url = self.endpoint(path_parts, params)?;
        self.get_url(url).await
    }

    async fn get_url(&self, url: Url) -> Result<reqwest::Response> {
        let (_, response) = self
            .execute(|http, token| {
                http.get(url.clone())
                    .header(header::ACCEPT, "application/vnd.github+json")
                    .header("X-GitHub-Api-Version", "2022-11-28")
                    .bearer_auth(token.expose_secret())
            })
            .await?;
        Ok(response)
    }

    /// Drain a Link-header-paginated listing, counting its items.
    async fn count_paginated<T: DeserializeOwned>(&self, path_parts: &[&str]) -> Result<i64> {
        let mut url = self.endpoint(path_parts, &[MAX_PER_PAGE])?;
        let mut total = 0i64;
        loop {
            let response = self.get_url(url).await?;
            let page: Page<T> = Page::from_response(response).await?;
            total += page.items.len() as i64;
            match page.links.next {
                Some(next) => url = next,
                None => break,
            }
        }
        Ok(total)
    }

    /// Execute a GraphQL query, deserializing the `data` member of the response envelope.
    pub async fn graphql<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T> {
        let payload = serde_json::json!({ "query": query, "variables": variables });
        loop {
            let (lease_index, response) = self
                .execute(|http, token| {
                    http.post(self.graphql_url.clone())
                        .header(header::ACCEPT, "application/json")
                        .bearer_auth(token.expose_secret())
                        .json(&payload)
                })
                .await?;

            let envelope: GraphQlEnvelope<T> = response.json().await?;

            if let Some(errors) = &envelope.errors {
                if !errors.is_empty() {
                    // GraphQL rate limiting arrives as an error entry on an HTTP 200 response.
                    if errors
                        .iter()
                        .any(|e| e.error_type.as_deref() == Some("RATE_LIMITED"))
                    {
                        debug!("GraphQL rate limit reported; rotating credential");
                        self.pool.record_exhausted(lease_index, None);
                        continue;
                    }

                    let forbidden = errors
                        .iter()
                        .filter(|e| e.error_type.as_deref() == Some("FORBIDDEN"))
                        .count();
                    if forbidden > 0 {
                        warn!("GraphQL response reported {forbidden} access-restricted resource(s)");
                    }
                    if envelope.data.is_none() {
                        if forbidden == errors.len() {
                            return Err(Error::PermissionDenied {
                                status: StatusCode::FORBIDDEN,
                                message: errors[0].message.clone(),
                            });
                        }
                        return Err(Error::GraphQl(errors[0].message.clone()));
                    }
                }
            }

            return envelope
                .data
                .ok_or_else(|| Error::GraphQl("response contained no data".to_string()));
        }
    }

    /// Issue a request, handling credential rotation and transient retries.
    ///
    /// Returns the index of the credential the successful response was obtained with, so callers
    /// can report further quota observations against it.
    async fn execute<F>(&self, build: F) -> Result<(usize, reqwest::Response)>
    where
        F: Fn(&reqwest::Client, &SecretString) -> reqwest::RequestBuilder,
    {
        'rotate: loop {
            let lease = self.lease().await;
            let mut attempt = 1u32;
            let mut delay = RETRY_BASE_DELAY;
            loop {
                let response = match build(&self.inner, lease.secret()).send().await {
                    Ok(response) => response,
                    Err(e) => {
                        if attempt >= MAX_ATTEMPTS {
                            return Err(Error::TransientFailure {
                                attempts: attempt,
                                message: e.to_string(),
                            });
                        }
                        debug!("Request error (attempt {attempt}/{MAX_ATTEMPTS}): {e}");
                        sleep(delay).await;
                        delay = (delay * 2).min(RETRY_MAX_DELAY);
                        attempt += 1;
                        continue;
                    }
                };

                let status = response.status();

                if status.is_success() {
                    self.note_quota(&lease, response.headers());
                    return Ok((lease.index(), response));
                }

                if let Some(reset_epoch) = rate_limit_reset(status, response.headers()) {
                    debug!("Credential #{} rate-limited; rotating", lease.index() + 1);
                    self.pool.record_exhausted(lease.index(), reset_epoch);
                    continue 'rotate;
                }

                if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                    let message = client_error_message(response).await;
                    return Err(Error::PermissionDenied { status, message });
                }

                if status == StatusCode::NOT_FOUND {
                    return Err(Error::NotFound);
                }

                if status.is_server_error() {
                    if attempt >= MAX_ATTEMPTS {
                        return Err(Error::TransientFailure {
                            attempts: attempt,
                            message: format!("HTTP {status}"),
                        });
                    }
                    debug!("HTTP {status} (attempt {attempt}/{MAX_ATTEMPTS})");
                    sleep(delay).await;
                    delay = (delay * 2).min(RETRY_MAX_DELAY);
                    attempt += 1;
                    continue;
                }

                return Err(Error::UnexpectedStatus(status));
            }
        }
    }

    /// Check out the next usable credential, sleeping through full pool exhaustion.
    ///
    /// The sleep is bounded by the earliest known quota reset.
    async fn lease(&self) -> Lease {
        loop {
            match self.pool.checkout() {
                Checkout::Ready(lease) => return lease,
                Checkout::Wait(wait) => {
                    warn!(
                        "All credentials are rate-limited; waiting {}s for the earliest quota reset",
                        wait.as_secs()
                    );
                    sleep(wait).await;
                }
            }
        }
    }

    fn note_quota(&self, lease: &Lease, headers: &header::HeaderMap) {
        let remaining = headers
            .get("x-ratelimit-remaining")
            .and_then(|v| atoi::atoi::<i64>(v.as_bytes()));
        let reset = headers
            .get("x-ratelimit-reset")
            .and_then(|v| atoi::atoi::<i64>(v.as_bytes()));
        if let (Some(remaining), Some(reset)) = (remaining, reset) {
            self.pool.record_usage(lease.index(), remaining, reset);
        }
    }
}

/// Determine whether a response indicates rate limiting, and if so the reset epoch (when known).
///
/// GitHub signals primary rate limiting with HTTP 403 plus `x-ratelimit-remaining: 0`, and
/// secondary rate limiting with a `Retry-After` header carrying a number of seconds; plain 429
/// responses also occur on GitHub Enterprise Server.
fn rate_limit_reset(status: StatusCode, headers: &header::HeaderMap) -> Option<Option<i64>> {
    if status != StatusCode::FORBIDDEN && status != StatusCode::TOO_MANY_REQUESTS {
        return None;
    }

    if let Some(retry_after) = headers.get("Retry-After") {
        let reset = atoi::atoi::<i64>(retry_after.as_bytes()).map(|s| Utc::now().timestamp() + s);
        return Some(reset);
    }

    let remaining_zero = matches!(
        headers
            .get("x-ratelimit-remaining")
            .map(HeaderValue::as_bytes),
        Some(b"0")
    );
    if status == StatusCode::TOO_MANY_REQUESTS || remaining_zero {
        let reset = headers
            .get("x-ratelimit-reset")
            .and_then(|v| atoi::atoi::<i64>(v.as_bytes()));
        return Some(reset);
    }

    None
}

async fn client_error_message(response: reqwest::Response) -> String {
    match response.json::<ClientError>().await {
        Ok(body) => body.message,
        Err(_) => String::new(),
    }
}

/// Create a URL from the given base, path parts, and parameters.
///
/// The path parts must not contain slashes.
fn url_from_path_parts(base_url: &Url, path_parts: &[&str], params: &[(&str, &str)]) -> Result<Url> {
    let mut url = base_url.clone();
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| Error::UrlBase(base_url.clone()))?;
        segments.pop_if_empty();
        for part in path_parts {
            if part.contains('/') {
                return Err(Error::UrlSlash(part.to_string()));
            }
            segments.push(part);
        }
    }
    if !params.is_empty() {
        url.query_pairs_mut().extend_pairs(params);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn make_url(base_url: &str, path_parts: &[&str], params: &[(&str, &str)]) -> Result<Url> {
        let base_url = Url::parse(base_url).unwrap();
        url_from_path_parts(&base_url, path_parts, params)
    }

    #[test]
    fn url_with_api_prefix() {
        let url = make_url("https://github.example.com/api/v3", &["orgs", "acme", "hooks"], &[])
            .unwrap();
        assert_eq!(url.as_str(), "https://github.example.com/api/v3/orgs/acme/hooks");
    }

    #[test]
    fn url_with_trailing_slash_base() {
        let url = make_url("https://github.example.com/api/v3/", &["orgs", "acme"], &[]).unwrap();
        assert_eq!(url.as_str(), "https://github.example.com/api/v3/orgs/acme");
    }

    #[test]
    fn url_with_params() {
        let url = make_url(
            "https://api.github.com",
            &["orgs", "acme", "actions", "runners"],
            &[("per_page", "100")],
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.github.com/orgs/acme/actions/runners?per_page=100"
        );
    }

    #[test]
    fn url_rejects_slash_in_part() {
        let res = make_url("https://api.github.com", &["orgs", "acme/evil"], &[]);
        match res {
            Err(Error::UrlSlash(p)) if p == "acme/evil" => (),
            _ => panic!("expected UrlSlash error"),
        }
    }

    #[test]
    fn url_rejects_cannot_be_a_base() {
        let res = make_url("mailto:blah@example.com", &[], &[]);
        match res {
            Err(Error::UrlBase(u)) if u.as_str() == "mailto:blah@example.com" => (),
            _ => panic!("expected UrlBase error"),
        }
    }

    #[test]
    fn rate_limit_reset_from_retry_after() {
        let mut headers = header::HeaderMap::new();
        headers.insert("Retry-After", HeaderValue::from_static("30"));
        let reset = rate_limit_reset(StatusCode::FORBIDDEN, &headers)
            .expect("Retry-After should classify as rate limiting");
        let expected = Utc::now().timestamp() + 30;
        let reset = reset.expect("Retry-After should produce a reset epoch");
        assert!((reset - expected).abs() <= 1, "reset was {reset}, expected about {expected}");
    }

    #[test]
    fn rate_limit_reset_from_remaining_zero() {
        let mut headers = header::HeaderMap::new();
        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("0"));
        headers.insert("x-ratelimit-reset", HeaderValue::from_static("1700000000"));
        assert_eq!(
            rate_limit_reset(StatusCode::FORBIDDEN, &headers),
            Some(Some(1700000000))
        );
    }

    #[test]
    fn plain_forbidden_is_not_rate_limiting() {
        let headers = header::HeaderMap::new();
        assert_eq!(rate_limit_reset(StatusCode::FORBIDDEN, &headers), None);
    }

    #[test]
    fn too_many_requests_is_rate_limiting() {
        let headers = header::HeaderMap::new();
        assert_eq!(rate_limit_reset(StatusCode::TOO_MANY_REQUESTS, &headers), Some(None));
    }
}
