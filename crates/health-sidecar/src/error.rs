use height_client::FetchError;
use std::{
    io,
    net::SocketAddr,
};

/// Misconfiguration detected while assembling the sidecar. Always fatal.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(
        "height request strategy {name:?} not found (available: {available}). \
         We need to know how to query height of the local blockchain node, check HEIGHT_CHECK_STRATEGY"
    )]
    UnknownHeightStrategy { name: String, available: String },
    #[error("remote RPC endpoints are required for the {strategy} strategy, check REMOTE_RPC_ENDPOINTS")]
    RemoteEndpointsRequired { strategy: &'static str },
    #[error("POCKET_ALTERNATE_ORACLE_API_KEY must be set when USE_ALTERNATE_ORACLE is enabled")]
    MissingOracleApiKey,
    #[error("invalid {role} URL {url:?}: {source}")]
    InvalidUrl {
        role: &'static str,
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("failed to build RPC client: {0}")]
    Client(#[from] FetchError),
}

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to bind health server address: {addr}")]
    BindAddress {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("health server error on {addr}")]
    Serve {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
}
