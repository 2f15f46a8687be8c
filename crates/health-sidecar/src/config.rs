use crate::{
    chains,
    height_strategy::{
        HeightSettings,
        HeightStrategy,
    },
    probes::{
        DEFAULT_AVAX_HEALTH_ENDPOINT,
        ProbeSettings,
        RoleNames,
    },
    state::SidecarState,
};
use clap::Parser;
use height_client::{
    DEFAULT_EVM_METHOD,
    DEFAULT_ORACLE_ENDPOINT,
    DEFAULT_RESULT_PATH,
};
use std::{
    net::{
        Ipv4Addr,
        SocketAddr,
    },
    time::Duration,
};
use tracing::{
    info,
    level_filters::LevelFilter,
};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Chain id, used as a metric label and to pick built-in oracles
    #[arg(long, env = "SIDECAR_CHAIN_ID")]
    pub chain_id: String,
    /// RPC endpoint of the node being judged
    #[arg(long, env = "LOCAL_RPC_ENDPOINT")]
    pub local_rpc_endpoint: String,
    /// Comma separated oracle endpoints, tried in order
    #[arg(long, env = "REMOTE_RPC_ENDPOINTS", value_delimiter = ',')]
    pub remote_rpc_endpoints: Vec<String>,
    /// Seconds between check cycles
    #[arg(
        long,
        env = "INTERVAL_SECONDS",
        default_value = "15",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub interval_seconds: u64,
    /// Port of the probe and metrics server
    #[arg(long, env = "LISTEN_PORT", default_value = "9090")]
    pub listen_port: u16,
    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: LevelFilter,
    /// Also export CPU, memory and fd gauges of the sidecar process
    #[arg(long, env = "INCLUDE_PROCESS_METRICS")]
    pub include_process_metrics: bool,
    /// How heights are requested: evm or pocket
    #[arg(long, env = "HEIGHT_CHECK_STRATEGY")]
    pub height_check_strategy: String,
    #[arg(long, env = "READINESS_PROBE_STRATEGY")]
    pub readiness_probe_strategy: Option<String>,
    #[arg(long, env = "LIVENESS_PROBE_STRATEGY")]
    pub liveness_probe_strategy: Option<String>,
    #[arg(long, env = "STARTUP_PROBE_STRATEGY")]
    pub startup_probe_strategy: Option<String>,
    /// Blocks the local node may lag behind the oracles
    #[arg(long, env = "HEIGHT_DIFF_THRESHOLD", default_value = "100")]
    pub height_diff_threshold: i64,
    /// Number of check cycles the local height must stay put before failing
    #[arg(
        long,
        env = "STALE_HEIGHT_CHECK_HISTORY_LENGTH",
        default_value = "70",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub stale_height_check_history_length: u64,
    #[arg(long, env = "COUNT_LOCAL_RPC_FAILS_AS_STALE_HEIGHT")]
    pub count_local_rpc_fails_as_stale_height: bool,
    /// Pass a stuck node while the oracles look stuck too
    #[arg(long, env = "IGNORE_HALTED_BLOCKCHAIN")]
    pub ignore_halted_blockchain: bool,
    #[arg(long, env = "FAIL_ON_REMOTE_RPC_UNAVAILABLE")]
    pub fail_on_remote_rpc_unavailable: bool,
    /// Query the GraphQL oracle for remote heights (pocket only)
    #[arg(long, env = "USE_ALTERNATE_ORACLE")]
    pub use_alternate_oracle: bool,
    #[arg(long, env = "EVM_BLOCK_NUMBER_METHOD_NAME", default_value = DEFAULT_EVM_METHOD)]
    pub evm_block_number_method_name: String,
    /// Dot separated path to the height in the JSON-RPC response
    #[arg(long, env = "EVM_RESULT_FIELD_PATH", default_value = DEFAULT_RESULT_PATH)]
    pub evm_result_field_path: String,
    #[arg(long, env = "POCKET_ALTERNATE_ORACLE_ENDPOINT", default_value = DEFAULT_ORACLE_ENDPOINT)]
    pub pocket_alternate_oracle_endpoint: String,
    #[arg(long, env = "POCKET_ALTERNATE_ORACLE_API_KEY", hide_env_values = true)]
    pub pocket_alternate_oracle_api_key: Option<String>,
    #[arg(long, env = "AVAX_HEALTH_ENDPOINT", default_value = DEFAULT_AVAX_HEALTH_ENDPOINT)]
    pub avax_health_endpoint: String,
}

impl Config {
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.listen_port))
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    pub fn height_settings(&self) -> HeightSettings {
        let mut evm_method = self.evm_block_number_method_name.clone();
        if evm_method == DEFAULT_EVM_METHOD {
            if let Some(method) = chains::preset(&self.chain_id).and_then(|p| p.evm_method) {
                info!(chain_id = %self.chain_id, method, "Using block number method of known chain");
                evm_method = method.to_owned();
            }
        }

        HeightSettings {
            evm_method,
            evm_result_path: self.evm_result_field_path.clone(),
            use_alternate_oracle: self.use_alternate_oracle,
            oracle_endpoint: self.pocket_alternate_oracle_endpoint.clone(),
            oracle_api_key: self.pocket_alternate_oracle_api_key.clone(),
        }
    }

    pub fn probe_settings(&self) -> ProbeSettings {
        ProbeSettings {
            height_diff_threshold: self.height_diff_threshold,
            fail_on_remote_rpc_unavailable: self.fail_on_remote_rpc_unavailable,
            stale_height_check_history_length: usize::try_from(
                self.stale_height_check_history_length,
            )
            .unwrap_or(usize::MAX),
            count_local_rpc_fails_as_stale_height: self.count_local_rpc_fails_as_stale_height,
            ignore_halted_blockchain: self.ignore_halted_blockchain,
            avax_health_endpoint: self.avax_health_endpoint.clone(),
        }
    }

    pub fn role_names(&self) -> RoleNames {
        RoleNames {
            readiness: self.readiness_probe_strategy.clone(),
            liveness: self.liveness_probe_strategy.clone(),
            startup: self.startup_probe_strategy.clone(),
        }
    }

    /// Oracle endpoints to poll, in priority order.
    ///
    /// The GraphQL oracle replaces the configured list. Otherwise an empty list
    /// falls back to the built-in endpoints of a known chain.
    pub fn remote_endpoints(&self, strategy: &HeightStrategy) -> Vec<String> {
        if let Some(oracle) = strategy.oracle_endpoint() {
            return vec![oracle.to_owned()];
        }

        let configured: Vec<String> = self
            .remote_rpc_endpoints
            .iter()
            .map(|endpoint| endpoint.trim())
            .filter(|endpoint| !endpoint.is_empty())
            .map(ToOwned::to_owned)
            .collect();
        if !configured.is_empty() {
            return configured;
        }

        match chains::preset(&self.chain_id) {
            Some(preset) => {
                info!(
                    chain_id = %self.chain_id,
                    chain = preset.name,
                    "No remote endpoints configured, using built-in oracles"
                );
                preset.remote_endpoints.iter().map(ToString::to_string).collect()
            }
            None => Vec::new(),
        }
    }

    pub fn sidecar_state(&self, strategy: &HeightStrategy) -> SidecarState {
        SidecarState::new(
            self.chain_id.as_str(),
            self.local_rpc_endpoint.as_str(),
            self.remote_endpoints(strategy),
            self.check_interval(),
        )
    }
}
