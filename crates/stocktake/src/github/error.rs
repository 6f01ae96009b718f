use reqwest::StatusCode;
use url::Url;

// -------------------------------------------------------------------------------------------------
// Error
// -------------------------------------------------------------------------------------------------
#[derive(Debug)]
pub enum Error {
    /// The credential used for a request hit its rate limit.
    ///
    /// This is handled internally by credential rotation and only escapes when a response cannot
    /// be classified any other way.
    RateLimited {
        /// Epoch second at which the credential's quota resets, when the server reported one
        reset_epoch: Option<i64>,
    },

    /// A 401 or non-rate-limit 403 response; retrying cannot change the outcome.
    PermissionDenied {
        status: StatusCode,
        message: String,
    },

    /// The entity does not exist (or vanished between listing and fetch).
    NotFound,

    /// The request kept failing with 5xx responses or connection errors after all retries.
    TransientFailure {
        attempts: u32,
        message: String,
    },

    /// A client-side response status outside the recognized taxonomy.
    UnexpectedStatus(StatusCode),

    /// The pool was configured with zero credentials.
    PoolExhausted,

    /// A GraphQL response carried errors and no usable data.
    GraphQl(String),

    UrlBase(Url),
    UrlSlash(String),
    Reqwest(reqwest::Error),
    InvalidTokenEnvVar(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::RateLimited { reset_epoch } => match reset_epoch {
                Some(reset) => write!(f, "request was rate-limited; quota resets at epoch {reset}"),
                None => write!(f, "request was rate-limited"),
            },
            Error::PermissionDenied { status, message } => {
                if message.is_empty() {
                    write!(f, "permission denied (HTTP {status})")
                } else {
                    write!(f, "permission denied (HTTP {status}): {message}")
                }
            }
            Error::NotFound => write!(f, "not found"),
            Error::TransientFailure { attempts, message } => {
                write!(f, "request failed after {attempts} attempts: {message}")
            }
            Error::UnexpectedStatus(status) => write!(f, "unexpected HTTP status {status}"),
            Error::PoolExhausted => write!(f, "no credentials configured"),
            Error::GraphQl(message) => write!(f, "GraphQL error: {message}"),
            Error::UrlBase(url) => write!(f, "error building URL: {url} cannot be a base"),
            Error::UrlSlash(part) => {
                write!(f, "error building URL: component {part:?} contains a slash")
            }
            Error::Reqwest(e) => write!(f, "error making request: {e}"),
            Error::InvalidTokenEnvVar(var) => {
                write!(f, "error loading credentials: ill-formed value of {var} environment variable")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Reqwest(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Reqwest(e)
    }
}
