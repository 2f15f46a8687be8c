//! Probe and metrics endpoints.

use crate::{
    error::ServerError,
    metrics::MetricsExporter,
    probes::{
        ProbeRole,
        ProbeRoles,
        ProbeVerdict,
    },
};
use axum::{
    Router,
    extract::State,
    http::header,
    response::IntoResponse,
    routing::get,
};
use std::{
    net::SocketAddr,
    sync::Arc,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{
    error,
    info,
    instrument,
};

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

#[derive(Debug, Clone)]
pub struct AppState {
    pub roles: Arc<ProbeRoles>,
    pub metrics: MetricsExporter,
}

#[derive(Debug)]
pub struct HealthServer {
    listener: TcpListener,
    bind_addr: SocketAddr,
    state: AppState,
}

impl HealthServer {
    pub async fn bind(bind_addr: SocketAddr, state: AppState) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(bind_addr).await.map_err(|e| {
            error!(
                bind_addr = %bind_addr,
                error = ?e,
                "Failed to bind health server listener"
            );
            ServerError::BindAddress {
                addr: bind_addr,
                source: e,
            }
        })?;
        let bind_addr = listener.local_addr().unwrap_or(bind_addr);

        Ok(Self {
            listener,
            bind_addr,
            state,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.bind_addr
    }

    #[instrument(
        name = "health_server::run",
        skip(self, shutdown),
        fields(bind_addr = %self.bind_addr),
        level = "debug"
    )]
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), ServerError> {
        info!(bind_addr = %self.bind_addr, "Health server starting");

        let addr = self.bind_addr;
        axum::serve(self.listener, router(self.state))
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
            .map_err(|e| {
                error!(error = ?e, "Health server failed");
                ServerError::Serve { addr, source: e }
            })?;

        info!("Health server stopped");
        Ok(())
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/metrics", get(metrics))
        .route("/health/readiness", get(readiness))
        .route("/health/liveness", get(liveness))
        .route("/health/startup", get(startup))
        .with_state(state)
}

#[instrument(name = "health_server::metrics", skip_all, level = "trace")]
async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)],
        state.metrics.render(),
    )
}

async fn readiness(State(state): State<AppState>) -> ProbeVerdict {
    probe(&state, ProbeRole::Readiness)
}

async fn liveness(State(state): State<AppState>) -> ProbeVerdict {
    probe(&state, ProbeRole::Liveness)
}

async fn startup(State(state): State<AppState>) -> ProbeVerdict {
    probe(&state, ProbeRole::Startup)
}

#[instrument(name = "health_server::probe", skip(state, role), fields(role = %role), level = "trace")]
fn probe(state: &AppState, role: ProbeRole) -> ProbeVerdict {
    state.roles.get(role).verdict()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        probes::{
            ProbeSettings,
            RoleNames,
        },
        test_util::shared_state,
    };
    use metrics_exporter_prometheus::PrometheusBuilder;
    use reqwest::StatusCode;

    fn local_exporter() -> MetricsExporter {
        MetricsExporter::new(PrometheusBuilder::new().build_recorder().handle(), false)
    }

    async fn serve(
        names: RoleNames,
        metrics: MetricsExporter,
    ) -> (SocketAddr, CancellationToken, tokio::task::JoinHandle<()>) {
        let state = shared_state("http://127.0.0.1:8545", &[]);
        state.record_local_height(42);
        let roles = ProbeRoles::select(&names, &state, &ProbeSettings::default()).unwrap();

        let server = HealthServer::bind(
            "127.0.0.1:0".parse().unwrap(),
            AppState {
                roles: Arc::new(roles),
                metrics,
            },
        )
        .await
        .unwrap();
        let addr = server.local_addr();
        assert_ne!(addr.port(), 0);

        let token = CancellationToken::new();
        let handle = tokio::spawn({
            let token = token.clone();
            async move { server.run(token).await.unwrap() }
        });
        (addr, token, handle)
    }

    async fn get(addr: SocketAddr, path: &str) -> (StatusCode, String) {
        let response = reqwest::get(format!("http://{addr}{path}")).await.unwrap();
        let status = response.status();
        (status, response.text().await.unwrap())
    }

    #[tokio::test]
    async fn serves_each_role() {
        let (addr, token, handle) = serve(
            RoleNames {
                readiness: Some("localRpcAvailable".to_owned()),
                liveness: Some("alwaysHealthy".to_owned()),
                startup: Some("alwaysFailure".to_owned()),
            },
            local_exporter(),
        )
        .await;

        let (status, body) = get(addr, "/health/readiness").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "Local RPC is available.");

        assert_eq!(get(addr, "/health/liveness").await.0, StatusCode::OK);
        assert_eq!(
            get(addr, "/health/startup").await.0,
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(get(addr, "/health/unknown").await.0, StatusCode::NOT_FOUND);

        token.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn unknown_strategy_fails_role_but_metrics_still_served() {
        let (addr, token, handle) = serve(
            RoleNames {
                readiness: Some("noSuchStrategy".to_owned()),
                liveness: Some("alwaysHealthy".to_owned()),
                startup: None,
            },
            local_exporter(),
        )
        .await;

        assert_eq!(
            get(addr, "/health/readiness").await.0,
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get(addr, "/health/startup").await.0,
            StatusCode::INTERNAL_SERVER_ERROR
        );

        let response = reqwest::get(format!("http://{addr}/metrics")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[reqwest::header::CONTENT_TYPE],
            PROMETHEUS_CONTENT_TYPE
        );

        token.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    #[cfg(target_os = "linux")]
    async fn process_metrics_served_when_enabled() {
        // Process gauges go through the global recorder, so this is the one
        // test that installs it.
        let recorder = crate::metrics::install().unwrap();
        let (addr, token, handle) =
            serve(RoleNames::default(), MetricsExporter::new(recorder, true)).await;

        let (status, body) = get(addr, "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("process_resident_memory_bytes"));
        assert!(body.contains("process_cpu_seconds_total"));

        token.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn bind_conflict_is_reported() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = taken.local_addr().unwrap();
        let state = shared_state("http://127.0.0.1:8545", &[]);
        let roles =
            ProbeRoles::select(&RoleNames::default(), &state, &ProbeSettings::default()).unwrap();

        let result = HealthServer::bind(
            addr,
            AppState {
                roles: Arc::new(roles),
                metrics: local_exporter(),
            },
        )
        .await;
        assert!(matches!(result, Err(ServerError::BindAddress { .. })));
    }
}
