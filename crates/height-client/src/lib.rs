//! Clients that turn a blockchain RPC endpoint into a chain height.
//!
//! Every dialect implements [`HeightSource`]. A fetch is a single request with
//! a fixed [`REQUEST_TIMEOUT`]; retrying or falling back to another endpoint is
//! left to the caller.
//!
//! ``` no_run
//! use height_client::{
//!     EvmClient,
//!     HeightSource,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = EvmClient::new("eth_blockNumber", "result").unwrap();
//!     let height = client.fetch_height("http://localhost:8545").await.unwrap();
//!     println!("{height}");
//! }
//! ```

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

mod evm;
mod parse;
mod pocket;

pub use evm::{
    DEFAULT_EVM_METHOD,
    DEFAULT_RESULT_PATH,
    EvmClient,
};
pub use parse::{
    ResultPath,
    parse_height,
};
pub use pocket::{
    DEFAULT_ORACLE_ENDPOINT,
    PocketClient,
    PocketOracleClient,
};

use reqwest::StatusCode;
use std::{
    future::Future,
    time::Duration,
};

/// Budget for a single height request, connect through body.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP client error: {0}")]
    Http(#[source] reqwest::Error),
    #[error("request timed out after {REQUEST_TIMEOUT:?}")]
    Timeout,
    #[error("HTTP error: {0}")]
    Status(StatusCode),
    #[error("JSON-RPC error code {code}: {message}")]
    JsonRpc { code: i64, message: String },
    #[error("GraphQL error: {0}")]
    GraphQl(String),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("invalid endpoint URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Malformed(err.to_string())
        } else {
            Self::Http(err)
        }
    }
}

/// Something that can report the chain height of an endpoint.
pub trait HeightSource: Send + Sync {
    fn fetch_height(&self, endpoint: &str) -> impl Future<Output = Result<u64, FetchError>> + Send;
}

/// The dialects a sidecar can be configured with.
#[derive(Debug, Clone)]
pub enum HeightFetcher {
    Evm(EvmClient),
    Pocket(PocketClient),
    PocketOracle(PocketOracleClient),
}

impl HeightFetcher {
    pub fn dialect(&self) -> &'static str {
        match self {
            Self::Evm(_) => "evm",
            Self::Pocket(_) => "pocket",
            Self::PocketOracle(_) => "pocket-oracle",
        }
    }
}

impl HeightSource for HeightFetcher {
    async fn fetch_height(&self, endpoint: &str) -> Result<u64, FetchError> {
        match self {
            Self::Evm(client) => client.fetch_height(endpoint).await,
            Self::Pocket(client) => client.fetch_height(endpoint).await,
            Self::PocketOracle(client) => client.fetch_height(endpoint).await,
        }
    }
}

/// `reqwest` client with rustls and [`REQUEST_TIMEOUT`], shared by every
/// dialect and by other single-request health checks.
pub fn http_client() -> Result<reqwest::Client, FetchError> {
    reqwest::Client::builder()
        .use_rustls_tls()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(FetchError::Http)
}

/// Fails with [`FetchError::Status`] on anything but a 2xx.
pub(crate) fn ensure_success(response: &reqwest::Response) -> Result<(), FetchError> {
    if response.status().is_success() {
        Ok(())
    } else {
        Err(FetchError::Status(response.status()))
    }
}
