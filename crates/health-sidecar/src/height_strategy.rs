//! Selects how heights are requested for the chain being monitored.

use crate::{
    error::ConfigError,
    failover::RpcFailover,
    state::SidecarState,
};
use height_client::{
    EvmClient,
    HeightFetcher,
    PocketClient,
    PocketOracleClient,
};
use std::{
    fmt,
    str::FromStr,
};
use tracing::{
    info,
    warn,
};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeightStrategyKind {
    Evm,
    Pocket,
}

impl HeightStrategyKind {
    pub const ALL: [Self; 2] = [Self::Evm, Self::Pocket];

    pub fn name(self) -> &'static str {
        match self {
            Self::Evm => "evm",
            Self::Pocket => "pocket",
        }
    }
}

impl fmt::Display for HeightStrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HeightStrategyKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| {
                ConfigError::UnknownHeightStrategy {
                    name: s.to_owned(),
                    available: Self::ALL.map(Self::name).join(", "),
                }
            })
    }
}

/// Dialect specific options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeightSettings {
    pub evm_method: String,
    pub evm_result_path: String,
    pub use_alternate_oracle: bool,
    pub oracle_endpoint: String,
    pub oracle_api_key: Option<String>,
}

impl Default for HeightSettings {
    fn default() -> Self {
        Self {
            evm_method: height_client::DEFAULT_EVM_METHOD.to_owned(),
            evm_result_path: height_client::DEFAULT_RESULT_PATH.to_owned(),
            use_alternate_oracle: false,
            oracle_endpoint: height_client::DEFAULT_ORACLE_ENDPOINT.to_owned(),
            oracle_api_key: None,
        }
    }
}

/// The fetcher pair used for the local node and for the oracles.
#[derive(Debug, Clone)]
pub struct HeightStrategy {
    kind: HeightStrategyKind,
    local: HeightFetcher,
    remote: HeightFetcher,
    oracle_endpoint: Option<String>,
}

impl HeightStrategy {
    /// Looks up a strategy by its configured name.
    pub fn select(name: &str, settings: &HeightSettings) -> Result<Self, ConfigError> {
        Self::new(name.parse()?, settings)
    }

    pub fn new(kind: HeightStrategyKind, settings: &HeightSettings) -> Result<Self, ConfigError> {
        let strategy = match kind {
            HeightStrategyKind::Evm => {
                if settings.use_alternate_oracle {
                    warn!("USE_ALTERNATE_ORACLE only applies to the pocket strategy, ignoring");
                }
                let client = EvmClient::new(&settings.evm_method, &settings.evm_result_path)?;
                Self {
                    kind,
                    local: HeightFetcher::Evm(client.clone()),
                    remote: HeightFetcher::Evm(client),
                    oracle_endpoint: None,
                }
            }
            HeightStrategyKind::Pocket if settings.use_alternate_oracle => {
                let api_key = settings
                    .oracle_api_key
                    .as_deref()
                    .filter(|key| !key.is_empty())
                    .ok_or(ConfigError::MissingOracleApiKey)?;
                Self {
                    kind,
                    local: HeightFetcher::Pocket(PocketClient::new()?),
                    remote: HeightFetcher::PocketOracle(PocketOracleClient::new(api_key)?),
                    oracle_endpoint: Some(settings.oracle_endpoint.clone()),
                }
            }
            HeightStrategyKind::Pocket => {
                let client = PocketClient::new()?;
                Self {
                    kind,
                    local: HeightFetcher::Pocket(client.clone()),
                    remote: HeightFetcher::Pocket(client),
                    oracle_endpoint: None,
                }
            }
        };
        Ok(strategy)
    }

    pub fn kind(&self) -> HeightStrategyKind {
        self.kind
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    /// Set when remote heights come from the GraphQL oracle rather than the
    /// configured remote endpoints.
    pub fn oracle_endpoint(&self) -> Option<&str> {
        self.oracle_endpoint.as_deref()
    }

    /// Checks the endpoints this strategy is about to poll.
    pub fn init(&self, state: &SidecarState) -> Result<(), ConfigError> {
        parse_url("local RPC", state.local_endpoint())?;
        for endpoint in state.remote_endpoints() {
            parse_url("remote RPC", endpoint)?;
        }

        let method = match &self.local {
            HeightFetcher::Evm(client) => Some(client.method()),
            _ => None,
        };
        info!(
            name = self.name(),
            local = self.local.dialect(),
            remote = self.remote.dialect(),
            chain_id = state.chain_id(),
            ?method,
            "Height request strategy initiated"
        );
        Ok(())
    }

    pub async fn fetch_local(&self, failover: &RpcFailover) -> i64 {
        failover.local(&self.local).await
    }

    pub async fn fetch_remote(&self, failover: &RpcFailover) -> i64 {
        failover.remote(&self.remote).await
    }
}

fn parse_url(role: &'static str, url: &str) -> Result<Url, ConfigError> {
    Url::parse(url).map_err(|source| {
        ConfigError::InvalidUrl {
            role,
            url: url.to_owned(),
            source,
        }
    })
}
