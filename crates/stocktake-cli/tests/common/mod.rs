//! Integration Test Utilities and Common Code

#![allow(dead_code)]

pub use assert_cmd::prelude::*;
pub use assert_fs::prelude::*;
pub use assert_fs::TempDir;
pub use predicates::prelude::*;
pub use predicates::str::RegexPredicate;
pub use std::path::Path;
pub use std::process::Command;

/// Build a `Command` for the `stocktake` binary with variadic command-line arguments.
///
/// The arguments can be anything that is allowed by `Command::arg`.
#[macro_export]
macro_rules! stocktake {
    ( $( $arg:expr ),* ) => {
        {
            let mut cmd = common::stocktake_cmd();
            $(
                cmd.arg($arg);
            )*
            cmd
        }
    }
}

/// Build an `assert_cmd::assert::Assert` by calling `stocktake!(args).assert().success()`.
#[macro_export]
macro_rules! stocktake_success {
    ( $( $arg:expr ),* ) => { stocktake!($( $arg ),*).assert().success() }
}

/// Build an `assert_cmd::assert::Assert` by calling `stocktake!(args).assert().failure()`.
#[macro_export]
macro_rules! stocktake_failure {
    ( $( $arg:expr ),* ) => { stocktake!($( $arg ),*).assert().failure() }
}

/// Get the command for the `stocktake` binary under test.
///
/// By default, this is the binary defined in this crate.
/// However, if the `ST_TEST_PROGRAM` environment variable is set, its value is used instead.
/// Its value should be an absolute path to the desired `stocktake` program to test.
pub fn stocktake_cmd() -> Command {
    let mut cmd = if let Ok(program) = std::env::var("ST_TEST_PROGRAM") {
        Command::new(program)
    } else {
        Command::cargo_bin("stocktake").expect("stocktake should be executable")
    };
    // Tests must not pick up credentials from the developer's environment.
    cmd.env_remove("ST_GITHUB_TOKENS");
    cmd
}

/// Create a `RegexPredicate` from the given pattern.
pub fn is_match(pat: &str) -> RegexPredicate {
    predicates::str::is_match(pat).expect("pattern should compile")
}
