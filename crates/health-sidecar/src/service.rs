//! Wires configuration, scheduler and HTTP server into one running sidecar.

use crate::{
    config::Config,
    error::{
        ConfigError,
        ServerError,
    },
    height_strategy::HeightStrategy,
    metrics::MetricsExporter,
    probes::ProbeRoles,
    scheduler::CheckScheduler,
    server::{
        AppState,
        HealthServer,
    },
    state::SharedState,
};
use std::{
    net::SocketAddr,
    sync::Arc,
};
use tokio_util::sync::CancellationToken;
use tracing::{
    error,
    info,
};

#[derive(Debug)]
pub struct Sidecar {
    state: SharedState,
    scheduler: Arc<CheckScheduler>,
    roles: Arc<ProbeRoles>,
    listen_addr: SocketAddr,
}

impl Sidecar {
    /// Builds and initializes every component. Any misconfiguration is fatal.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let strategy = HeightStrategy::select(&config.height_check_strategy, &config.height_settings())?;
        let state = config.sidecar_state(&strategy).shared();
        strategy.init(&state)?;

        let roles = Arc::new(ProbeRoles::select(
            &config.role_names(),
            &state,
            &config.probe_settings(),
        )?);
        roles.init()?;

        info!(
            chain_id = state.chain_id(),
            local = state.local_endpoint(),
            remotes = ?state.remote_endpoints(),
            interval = ?state.check_interval(),
            "Health sidecar configured"
        );

        Ok(Self {
            scheduler: Arc::new(CheckScheduler::new(state.clone(), strategy, roles.clone())),
            state,
            roles,
            listen_addr: config.listen_addr(),
        })
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    pub fn roles(&self) -> &Arc<ProbeRoles> {
        &self.roles
    }

    /// Runs until `shutdown` fires. One check cycle completes before the
    /// server starts answering probes.
    pub async fn run(
        self,
        metrics: MetricsExporter,
        shutdown: CancellationToken,
    ) -> Result<(), ServerError> {
        let server = HealthServer::bind(
            self.listen_addr,
            AppState {
                roles: self.roles.clone(),
                metrics,
            },
        )
        .await?;

        self.scheduler.tick().await;

        let scheduler = self.scheduler.clone();
        let scheduler_shutdown = shutdown.clone();
        let scheduler_task = tokio::spawn(async move { scheduler.run(scheduler_shutdown).await });

        let result = server.run(shutdown.clone()).await;
        // A failed server must not leave the scheduler running.
        shutdown.cancel();
        if let Err(e) = scheduler_task.await {
            error!(error = ?e, "Check scheduler task panicked");
        }
        result
    }
}
