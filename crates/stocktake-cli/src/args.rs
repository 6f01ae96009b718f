use clap::{crate_description, ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::io::IsTerminal;
use std::path::PathBuf;
use url::Url;

// -----------------------------------------------------------------------------
// command-line args
// -----------------------------------------------------------------------------
#[derive(Parser, Debug)]
#[command(
    name("stocktake"),
    bin_name("stocktake"),

    author,   // retrieved from Cargo.toml `authors`
    version,  // retrieved from Cargo.toml `version`
    about,    // retrieved from Cargo.toml `description`

    long_about = concat!(
        crate_description!(),
    ),
)]
#[deny(missing_docs)]
/// Inventory a GitHub Enterprise account
pub struct CommandLineArgs {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub global_args: GlobalArgs,
}

impl CommandLineArgs {
    pub fn parse_args() -> Self {
        let mut args = Self::parse();

        // If `NO_COLOR` is set in the environment, disable colored output
        //
        // https://no-color.org/
        if std::env::var("NO_COLOR").is_ok() {
            args.global_args.color = Mode::Never
        }

        args
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Inventory the organizations and repositories of a GitHub Enterprise account
    ///
    /// Organizations and repositories are enumerated through the GraphQL API; webhooks, teams,
    /// GitHub Apps, runners, and workflows are fetched through the REST API. Rows are appended to
    /// the two CSV reports as soon as each entity has been processed, so an interrupted run keeps
    /// everything processed up to that point.
    ///
    /// Personal access tokens are read from the ST_GITHUB_TOKENS environment variable as a
    /// comma-separated list. Supplying several tokens lets the collector rotate between them as
    /// rate limits are consumed. The tokens need `read:enterprise` and `admin:org` scope to see
    /// runner and webhook details; fields a token cannot read are reported as zero and noted in
    /// the log.
    #[command(display_order = 1)]
    Inventory(InventoryArgs),
}

// -----------------------------------------------------------------------------
// global options
// -----------------------------------------------------------------------------
#[derive(Args, Debug)]
#[command(next_help_heading = "Global Options")]
pub struct GlobalArgs {
    /// Enable verbose output
    ///
    /// This can be repeated up to 3 times to enable successively more output.
    #[arg(global=true, long, short, action=ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(global = true, long, short)]
    pub quiet: bool,

    /// Enable or disable colored output
    ///
    /// When this is "auto", colors are enabled when stdout is a tty.
    ///
    /// If the `NO_COLOR` environment variable is set, it takes precedence and is equivalent to `--color=never`.
    #[arg(global=true, long, default_value_t=Mode::Auto, value_name="MODE")]
    pub color: Mode,

    /// Enable or disable progress bars
    ///
    /// When this is "auto", progress bars are enabled when stderr is a tty.
    #[arg(global=true, long, default_value_t=Mode::Auto, value_name="MODE")]
    pub progress: Mode,
}

impl GlobalArgs {
    pub fn use_color(&self) -> bool {
        match self.color {
            Mode::Never => false,
            Mode::Always => true,
            Mode::Auto => std::io::stdout().is_terminal(),
        }
    }

    pub fn use_progress(&self) -> bool {
        match self.progress {
            Mode::Never => false,
            Mode::Always => true,
            Mode::Auto => std::io::stderr().is_terminal(),
        }
    }
}

/// A generic auto/never/always mode value
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum Mode {
    Auto,
    Never,
    Always,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Mode::Auto => "auto",
            Mode::Never => "never",
            Mode::Always => "always",
        };
        write!(f, "{s}")
    }
}

// -----------------------------------------------------------------------------
// `inventory` command
// -----------------------------------------------------------------------------
#[derive(Args, Debug)]
pub struct InventoryArgs {
    /// The slug of the enterprise account to inventory
    #[arg(value_name = "ENTERPRISE")]
    pub enterprise: String,

    /// Use the specified URL for REST API access
    ///
    /// If accessing a GitHub Enterprise Server instance, this value should be the entire base URL
    /// including the `api/v3` portion, e.g., `https://github.example.com/api/v3`.
    #[arg(
        long,
        value_name = "URL",
        default_value = "https://api.github.com",
        visible_alias = "api-url"
    )]
    pub github_api_url: Url,

    /// Use the specified URL for GraphQL API access
    ///
    /// For GitHub Enterprise Server this is typically `https://github.example.com/api/graphql`.
    #[arg(
        long,
        value_name = "URL",
        default_value = "https://api.github.com/graphql",
        visible_alias = "graphql-url"
    )]
    pub github_graphql_url: Url,

    /// Write the repository report to the specified path
    #[arg(long, value_name = "PATH", default_value = "stocktake_repositories.csv")]
    pub repo_report: PathBuf,

    /// Write the organization report to the specified path
    #[arg(long, value_name = "PATH", default_value = "stocktake_organizations.csv")]
    pub org_report: PathBuf,

    /// Process at most the first N organizations in listing order
    ///
    /// A value of 0 means no limit. This is mostly useful for trial runs against a large
    /// enterprise.
    #[arg(long, value_name = "N", default_value_t = 0)]
    pub max_orgs: usize,

    /// Ignore validation of TLS certificates
    #[arg(long)]
    pub ignore_certs: bool,

    #[command(flatten)]
    pub output_args: OutputArgs<SummaryOutputFormat>,
}

// -----------------------------------------------------------------------------
// output options
// -----------------------------------------------------------------------------
#[derive(Args, Debug)]
#[command(next_help_heading = "Output Options")]
pub struct OutputArgs<Format: ValueEnum + Send + Sync + 'static> {
    /// Write the run summary to the specified path
    ///
    /// If this argument is not provided, stdout will be used.
    #[arg(long, short, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Write the run summary in the specified format
    #[arg(long, short, value_name="FORMAT", default_value="human")]
    pub format: Format,
}

impl<Format: ValueEnum + Send + Sync> OutputArgs<Format> {
    /// Get a writer for the specified output destination.
    pub fn get_writer(&self) -> std::io::Result<Box<dyn std::io::Write>> {
        use std::fs::File;
        use std::io::BufWriter;

        match &self.output {
            None => Ok(Box::new(BufWriter::new(std::io::stdout()))),
            Some(p) => {
                let f = File::create(p)?;
                Ok(Box::new(BufWriter::new(f)))
            }
        }
    }
}

// -----------------------------------------------------------------------------
// summary output format
// -----------------------------------------------------------------------------
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum SummaryOutputFormat {
    /// A text-based format designed for humans
    Human,

    /// Pretty-printed JSON format
    Json,
}

impl std::fmt::Display for SummaryOutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SummaryOutputFormat::Human => "human",
            SummaryOutputFormat::Json => "json",
        };
        write!(f, "{s}")
    }
}
