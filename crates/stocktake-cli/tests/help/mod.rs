//! Tests for `stocktake` help and argument handling

use super::*;

#[test]
fn no_args_prints_usage() {
    stocktake_failure!().stderr(predicate::str::contains("Usage:"));
}

#[test]
fn help_lists_the_inventory_command() {
    stocktake_success!("help")
        .stdout(predicate::str::contains("inventory"))
        .stdout(predicate::str::contains("Usage:"));
}

#[test]
fn inventory_help_mentions_tokens_and_reports() {
    stocktake_success!("help", "inventory")
        .stdout(predicate::str::contains("ST_GITHUB_TOKENS"))
        .stdout(predicate::str::contains("--repo-report"))
        .stdout(predicate::str::contains("--org-report"))
        .stdout(predicate::str::contains("--max-orgs"));
}

#[test]
fn version_prints_something_versionlike() {
    stocktake_success!("--version").stdout(common::is_match(r"stocktake(-cli)? \d+\.\d+"));
}

#[test]
fn inventory_requires_an_enterprise() {
    stocktake_failure!("inventory").stderr(predicate::str::contains("ENTERPRISE"));
}
