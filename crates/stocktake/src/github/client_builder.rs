use reqwest::{IntoUrl, Url};
use secrecy::SecretString;
use tracing::debug;

use super::token_pool::TokenPool;
use super::{Client, Error, Result};

// -------------------------------------------------------------------------------------------------
// ClientBuilder
// -------------------------------------------------------------------------------------------------
pub struct ClientBuilder {
    rest_url: Url,
    graphql_url: Url,
    tokens: Vec<SecretString>,
    ignore_certs: bool,
}

impl ClientBuilder {
    /// The user agent string sent when accessing the GitHub APIs
    const USER_AGENT: &'static str = "stocktake";

    /// The environment variable holding a comma-separated list of personal access tokens
    pub const TOKENS_ENV_VAR: &'static str = "ST_GITHUB_TOKENS";

    /// Create a new `ClientBuilder` targeting <https://api.github.com> with no credentials.
    pub fn new() -> Self {
        ClientBuilder {
            rest_url: Url::parse("https://api.github.com").expect("default REST URL should parse"),
            graphql_url: Url::parse("https://api.github.com/graphql")
                .expect("default GraphQL URL should parse"),
            tokens: Vec::new(),
            ignore_certs: false,
        }
    }

    /// Use the specified REST API base URL.
    pub fn rest_url<T: IntoUrl>(mut self, url: T) -> Result<Self> {
        self.rest_url = url.into_url()?;
        Ok(self)
    }

    /// Use the specified GraphQL API URL.
    pub fn graphql_url<T: IntoUrl>(mut self, url: T) -> Result<Self> {
        self.graphql_url = url.into_url()?;
        Ok(self)
    }

    /// Add one personal access token to the rotation.
    pub fn token(mut self, token: SecretString) -> Self {
        self.tokens.push(token);
        self
    }

    /// Ignore validation of TLS certs.
    pub fn ignore_certs(mut self, ignore_certs: bool) -> Self {
        self.ignore_certs = ignore_certs;
        self
    }

    /// Load personal access tokens from the `ST_GITHUB_TOKENS` environment variable
    /// (comma-separated; blank entries are ignored).
    pub fn tokens_from_env(self) -> Result<Self> {
        self.tokens_from_env_var(Self::TOKENS_ENV_VAR)
    }

    fn tokens_from_env_var(mut self, env_var_name: &str) -> Result<Self> {
        match std::env::var(env_var_name) {
            Err(std::env::VarError::NotPresent) => {
                debug!("No access tokens provided via {env_var_name}");
            }
            Err(std::env::VarError::NotUnicode(_)) => {
                return Err(Error::InvalidTokenEnvVar(env_var_name.to_string()));
            }
            Ok(val) => {
                let tokens: Vec<SecretString> = val
                    .split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(|t| SecretString::from(t.to_string()))
                    .collect();
                debug!(
                    "Loaded {} access token(s) from {env_var_name} environment variable",
                    tokens.len()
                );
                self.tokens.extend(tokens);
            }
        }
        Ok(self)
    }

    /// Build a `Client` from this `ClientBuilder`.
    ///
    /// Fails with `Error::PoolExhausted` when no tokens were supplied: enterprise inventory
    /// endpoints are not accessible anonymously.
    pub fn build(self) -> Result<Client> {
        let inner = reqwest::ClientBuilder::new()
            .user_agent(Self::USER_AGENT)
            .danger_accept_invalid_certs(self.ignore_certs)
            .build()?;
        let pool = TokenPool::new(self.tokens)?;
        Ok(Client::from_parts(self.rest_url, self.graphql_url, inner, pool))
    }
}

impl Default for ClientBuilder {
    /// Equivalent to `ClientBuilder::new()`.
    fn default() -> Self {
        Self::new()
    }
}
