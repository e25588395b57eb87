use thiserror::Error;

use crate::core::FetcherName;

#[derive(Debug, Error)]
pub enum ExporterError {
    #[error("Invalid configuration:\n{0}")]
    Config(#[from] ConfigError),

    #[error("Invalid fetcher graph:\n{0}")]
    Controller(#[from] ControllerError),

    #[error("Couldn't build HTTP client.\n{0}")]
    Client(#[from] reqwest::Error),

    #[error("Couldn't render metrics.\n{0}")]
    Render(#[from] prometheus::Error),

    #[error("Rendered metrics are not valid UTF-8.\n{0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Couldn't read config file '{0}'.\n{1}")]
    Read(String, std::io::Error),

    #[error("Couldn't parse config file.\n{0}")]
    Parse(#[from] toml::de::Error),

    #[error("No chains are configured")]
    NoChains,

    #[error("Chain '{0}' is configured more than once")]
    DuplicateChain(String),

    #[error("Chain '{chain}': {reason}")]
    Invalid { chain: String, reason: &'static str },
}

/// Errors detected while assembling the fetcher graph. These are fatal and
/// surface before any request is served.
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("Fetcher '{0}' is registered more than once")]
    Duplicate(FetcherName),

    #[error("Fetcher '{fetcher}' depends on '{dependency}', which is not registered")]
    UnknownDependency {
        fetcher: FetcherName,
        dependency: FetcherName,
    },

    #[error("Cycle detected in fetcher graph at '{0}'")]
    Cycle(FetcherName),

    #[error("Invalid progress bar template.\n{0}")]
    Template(#[from] indicatif::style::TemplateError),
}

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("couldn't decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("{0}")]
    Malformed(String),

    #[error("request cancelled")]
    Cancelled,
}

impl RpcError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RpcError::Cancelled)
    }
}

/// Misuse of the dependency outputs handed to a fetcher.
#[derive(Debug, Error)]
pub enum DependencyError {
    #[error("'{0}' is not a declared dependency")]
    Undeclared(FetcherName),

    #[error("'{name}' does not hold a value of type {expected}")]
    WrongType {
        name: FetcherName,
        expected: &'static str,
    },
}
