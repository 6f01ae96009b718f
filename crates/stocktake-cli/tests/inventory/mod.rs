//! Tests for the `stocktake inventory` command

use super::*;

use pretty_assertions::assert_eq;
use wiremock::matchers::{body_string_contains, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[test]
fn inventory_without_tokens_is_a_fatal_startup_error() {
    let dir = TempDir::new().expect("should create tempdir");
    stocktake!(
        "inventory",
        "blackwood",
        "--repo-report",
        dir.path().join("repos.csv"),
        "--org-report",
        dir.path().join("orgs.csv")
    )
    .assert()
    .failure()
    .code(2)
    .stderr(predicate::str::contains("ST_GITHUB_TOKENS"));

    // Nothing was reachable, so no report files may exist.
    assert!(!dir.path().join("repos.csv").exists());
    assert!(!dir.path().join("orgs.csv").exists());
}

#[test]
fn inventory_rejects_a_malformed_api_url() {
    stocktake_failure!("inventory", "blackwood", "--api-url", "not a url")
        .stderr(predicate::str::contains("invalid"));
}

/// Run the binary against a fully mocked API and check the files it leaves behind.
#[tokio::test(flavor = "multi_thread")]
async fn inventory_end_to_end_against_mock_server() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rate_limit"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "resources": {
                "core": { "limit": 5000, "remaining": 4999, "reset": 9999999999i64, "used": 1 },
                "graphql": { "limit": 5000, "remaining": 5000, "reset": 9999999999i64, "used": 0 }
            },
            "rate": { "limit": 5000, "remaining": 4999, "reset": 9999999999i64, "used": 1 }
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_string_contains("enterprise(slug:"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": { "enterprise": { "organizations": {
                "pageInfo": { "hasNextPage": false, "endCursor": null },
                "nodes": [ {
                    "login": "alpha",
                    "name": "Alpha",
                    "description": "The only org",
                    "url": "https://github.example.com/alpha",
                    "createdAt": "2019-06-01T00:00:00Z"
                } ]
            } } }
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_string_contains("\"org\":\"alpha\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": { "organization": { "repositories": {
                "pageInfo": { "hasNextPage": false, "endCursor": null },
                "nodes": [ {
                    "name": "vault",
                    "nameWithOwner": "alpha/vault",
                    "description": "Secrets live here",
                    "url": "https://github.example.com/alpha/vault",
                    "visibility": "PRIVATE",
                    "isPrivate": true,
                    "isFork": false,
                    "isArchived": false,
                    "createdAt": "2020-01-01T00:00:00Z",
                    "updatedAt": "2020-06-01T00:00:00Z",
                    "pushedAt": "2020-06-02T00:00:00Z",
                    "defaultBranchRef": { "name": "main" },
                    "forkCount": 0,
                    "issues": { "totalCount": 2 },
                    "pullRequests": { "totalCount": 1 },
                    "releases": { "totalCount": 0 },
                    "branches": { "totalCount": 3 },
                    "tags": { "totalCount": 1 }
                } ]
            } } }
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/orgs/[^/]+/(hooks|teams)$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/orgs/[^/]+/installations$"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "total_count": 0 })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/orgs/[^/]+/actions/(runners|hosted-runners)$"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "total_count": 0 })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/repos/[^/]+/[^/]+$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "size": 12 })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/repos/[^/]+/[^/]+/actions/workflows$"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "total_count": 1 })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/repos/[^/]+/[^/]+/hooks$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/repos/[^/]+/[^/]+/actions/runners$"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "total_count": 0 })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/repos/[^/]+/[^/]+/installation$"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = TempDir::new().expect("should create tempdir");
    let repo_report = dir.path().join("repos.csv");
    let org_report = dir.path().join("orgs.csv");

    stocktake!(
        "inventory",
        "blackwood",
        "--api-url",
        server.uri(),
        "--graphql-url",
        format!("{}/graphql", server.uri()),
        "--repo-report",
        &repo_report,
        "--org-report",
        &org_report
    )
    .env("ST_GITHUB_TOKENS", "test-token")
    .assert()
    .success()
    .stdout(predicate::str::contains("Inventory Summary"))
    .stdout(predicate::str::contains("Repositories"));

    let repo_csv = std::fs::read_to_string(&repo_report).expect("repository report should exist");
    let mut lines = repo_csv.lines();
    assert_eq!(
        lines.next().map(|l| l.starts_with("Organization,Repository,")),
        Some(true)
    );
    assert_eq!(lines.count(), 1);
    assert!(repo_csv.contains("alpha,vault,"));

    let org_csv = std::fs::read_to_string(&org_report).expect("organization report should exist");
    assert_eq!(org_csv.lines().count(), 2);
    assert!(org_csv.contains("alpha,"));
}
