//! Periodic check cycle: refresh heights, then run each probe's background work.

use crate::{
    failover::RpcFailover,
    height_strategy::HeightStrategy,
    metrics,
    probes::ProbeRoles,
    state::SharedState,
};
use std::{
    sync::Arc,
    time::Instant,
};
use tokio::time::{
    Instant as TokioInstant,
    MissedTickBehavior,
    interval_at,
};
use tokio_util::sync::CancellationToken;
use tracing::{
    debug,
    info,
};

#[derive(Debug)]
pub struct CheckScheduler {
    state: SharedState,
    strategy: HeightStrategy,
    failover: RpcFailover,
    roles: Arc<ProbeRoles>,
}

impl CheckScheduler {
    pub fn new(state: SharedState, strategy: HeightStrategy, roles: Arc<ProbeRoles>) -> Self {
        Self {
            failover: RpcFailover::new(state.clone()),
            state,
            strategy,
            roles,
        }
    }

    /// Runs one full check cycle.
    pub async fn tick(&self) {
        let started_at = Instant::now();

        self.update_local_height().await;
        if self.state.perform_remote_checks() {
            self.update_remote_height().await;
        }

        for strategy in self.roles.unique() {
            if strategy.has_background() {
                strategy.background().await;
            }
        }

        let elapsed = started_at.elapsed();
        metrics::record_tick(elapsed);
        debug!(status = ?self.state.status(), ?elapsed, "check cycle finished");
    }

    /// Ticks every `check_interval` until `shutdown` fires. The first tick is
    /// one interval away; callers run the startup tick themselves.
    pub async fn run(&self, shutdown: CancellationToken) {
        let period = self.state.check_interval();
        let mut ticker = interval_at(TokioInstant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                _ = ticker.tick() => self.tick().await,
            }
        }
        info!("check scheduler stopped");
    }

    async fn update_local_height(&self) {
        let height = self.strategy.fetch_local(&self.failover).await;
        let previous = self.state.record_local_height(height);

        if height > 0 {
            metrics::record_local_height(self.state.chain_id(), height);
            if !previous.local_rpc_available {
                info!(height, "[UPDATE_HEIGHT]: local RPC became available");
            }
        } else if previous.local_rpc_available {
            info!("[UPDATE_HEIGHT]: local RPC is unavailable");
        }
    }

    async fn update_remote_height(&self) {
        let height = self.strategy.fetch_remote(&self.failover).await;
        let previous = self.state.record_remote_height(height);

        if height > 0 {
            metrics::record_remote_height(self.state.chain_id(), height);
            if previous.remote_rpc_unstable {
                info!(height, "[UPDATE_HEIGHT]: remote RPC became available");
            }
        } else if !previous.remote_rpc_unstable {
            info!("[UPDATE_HEIGHT]: remote RPC is no longer available");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        height_strategy::{
            HeightSettings,
            HeightStrategyKind,
        },
        probes::{
            ProbeRole,
            ProbeSettings,
            RoleNames,
        },
        state::{
            SidecarState,
            UNKNOWN_HEIGHT,
        },
        test_util::{
            CHAIN_ID,
            with_recorder,
        },
    };
    use axum::http::StatusCode;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::{
        Mock,
        MockServer,
        ResponseTemplate,
        matchers::method,
    };

    async fn node(height: &str) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": height,
            })))
            .mount(&server)
            .await;
        server
    }

    async fn down() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;
        server
    }

    fn scheduler(local: &str, remotes: &[String], readiness: &str) -> CheckScheduler {
        let state = SidecarState::new(CHAIN_ID, local, remotes.to_vec(), Duration::from_millis(50))
            .shared();
        let strategy = HeightStrategy::new(HeightStrategyKind::Evm, &HeightSettings::default()).unwrap();
        let names = RoleNames {
            readiness: Some(readiness.to_owned()),
            liveness: Some("localRpcAvailable".to_owned()),
            startup: Some("alwaysHealthy".to_owned()),
        };
        let roles = ProbeRoles::select(&names, &state, &ProbeSettings::default()).unwrap();
        roles.init().unwrap();
        CheckScheduler::new(state, strategy, Arc::new(roles))
    }

    #[test]
    fn tick_updates_state_and_metrics() {
        let recorded = with_recorder(|| async {
            let local = node("0x64").await;
            let remote = node("0x96").await;
            let scheduler = scheduler(&local.uri(), &[remote.uri()], "localVsRemote");
            scheduler.tick().await;
            (scheduler.state.status(), scheduler.roles.get(ProbeRole::Readiness).verdict())
        });

        let (status, ref verdict) = recorded.output;
        assert_eq!(status.last_local_height, 100);
        assert_eq!(status.last_remote_height, 150);
        assert!(status.local_rpc_available);
        assert!(status.local_rpc_initiated);
        assert!(!status.remote_rpc_unstable);
        assert_eq!(verdict.status, StatusCode::OK);

        let chain = [("chain_id", CHAIN_ID)];
        assert_eq!(recorded.gauge("blockchain_local_node_height", &chain), Some(100.0));
        assert_eq!(recorded.gauge("blockchain_remote_node_height", &chain), Some(150.0));
        assert_eq!(
            recorded.gauge(
                "blockchain_height_diff",
                &[("chain_id", CHAIN_ID), ("threshold", "100")]
            ),
            Some(50.0)
        );
        assert_eq!(recorded.counter("health_sidecar_ticks_total", &[]), 1);
    }

    #[test]
    fn remote_failover_and_unavailable_local() {
        let recorded = with_recorder(|| async {
            let local = down().await;
            let broken = down().await;
            let remote = node("0x96").await;
            let scheduler = scheduler(&local.uri(), &[broken.uri(), remote.uri()], "localVsRemote");
            scheduler.tick().await;
            (broken.uri(), scheduler.state.status())
        });

        let (ref broken, status) = recorded.output;
        assert_eq!(status.last_local_height, UNKNOWN_HEIGHT);
        assert!(!status.local_rpc_available);
        assert_eq!(status.last_remote_height, 150);
        // Local never answered, so its failure is not counted yet.
        assert_eq!(
            recorded.counter(
                "blockchain_rpc_check_errors",
                &[("destination", "local"), ("chain_id", CHAIN_ID)]
            ),
            0
        );
        assert_eq!(
            recorded.counter(
                "blockchain_rpc_check_errors",
                &[("destination", broken.as_str()), ("chain_id", CHAIN_ID)]
            ),
            1
        );
        assert_eq!(recorded.gauge("blockchain_local_node_height", &[("chain_id", CHAIN_ID)]), None);
    }

    #[tokio::test]
    async fn without_remotes_only_local_is_polled() {
        let local = node("0x10").await;
        let scheduler = scheduler(&local.uri(), &[], "localRpcAvailable");
        scheduler.tick().await;

        let status = scheduler.state.status();
        assert_eq!(status.last_local_height, 16);
        assert_eq!(status.last_remote_height, UNKNOWN_HEIGHT);
        assert!(!status.remote_rpc_unstable);
    }

    #[tokio::test]
    async fn shared_strategy_runs_background_once_per_tick() {
        let local = node("0x64").await;
        let remote = node("0x64").await;
        let state = SidecarState::new(
            CHAIN_ID,
            local.uri(),
            vec![remote.uri()],
            Duration::from_millis(50),
        )
        .shared();
        let strategy = HeightStrategy::new(HeightStrategyKind::Evm, &HeightSettings::default()).unwrap();
        let names = RoleNames {
            readiness: Some("heightNotClimbing".to_owned()),
            liveness: Some("heightNotClimbing".to_owned()),
            startup: Some("heightNotClimbing".to_owned()),
        };
        let settings = ProbeSettings {
            stale_height_check_history_length: 3,
            ..ProbeSettings::default()
        };
        let roles = Arc::new(ProbeRoles::select(&names, &state, &settings).unwrap());
        let scheduler = CheckScheduler::new(state, strategy, roles.clone());

        // Three roles but a single instance: the window fills after three ticks.
        for _ in 0..2 {
            scheduler.tick().await;
        }
        assert_eq!(roles.get(ProbeRole::Liveness).verdict().status, StatusCode::OK);

        scheduler.tick().await;
        assert_eq!(
            roles.get(ProbeRole::Liveness).verdict().status,
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[tokio::test]
    async fn run_stops_on_cancellation() {
        let local = node("0x10").await;
        let scheduler = Arc::new(scheduler(&local.uri(), &[], "localRpcAvailable"));
        let token = CancellationToken::new();

        let handle = tokio::spawn({
            let scheduler = scheduler.clone();
            let token = token.clone();
            async move { scheduler.run(token).await }
        });

        tokio::time::sleep(Duration::from_millis(200)).await;
        token.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("scheduler should stop")
            .unwrap();

        assert!(scheduler.state.status().local_rpc_initiated);
    }
}
