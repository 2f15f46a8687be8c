use anyhow::{
    Context,
    Result,
};
use clap::Parser;
use health_sidecar::{
    Config,
    Sidecar,
    metrics::{
        self,
        MetricsExporter,
    },
};
use tokio_util::sync::CancellationToken;
use tracing::{
    info,
    warn,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();

    // RUST_LOG wins over LOG_LEVEL when both are set.
    let filter = EnvFilter::builder()
        .with_default_directive(config.log_level.into())
        .from_env_lossy();
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let handle = metrics::install().context("failed to install prometheus recorder")?;
    let exporter = MetricsExporter::new(handle, config.include_process_metrics);
    let sidecar = Sidecar::from_config(&config).context("invalid sidecar configuration")?;

    let shutdown = CancellationToken::new();
    tokio::spawn(cancel_on_signal(shutdown.clone()));

    sidecar
        .run(exporter, shutdown)
        .await
        .context("health sidecar terminated unexpectedly")?;
    info!("Health sidecar stopped");
    Ok(())
}

/// Cancels `shutdown` on the first SIGTERM (pod eviction) or SIGINT.
/// Without working handlers the sidecar keeps serving until killed.
#[cfg(unix)]
async fn cancel_on_signal(shutdown: CancellationToken) {
    use tokio::signal::unix::{
        SignalKind,
        signal,
    };

    let (mut term, mut int) = match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(term), Ok(int)) => (term, int),
        (Err(e), _) | (_, Err(e)) => {
            warn!(error = ?e, "Signal handlers unavailable, graceful shutdown disabled");
            return;
        }
    };

    let name = tokio::select! {
        _ = term.recv() => "SIGTERM",
        _ = int.recv() => "SIGINT",
    };
    info!(signal = name, "Stopping health sidecar");
    shutdown.cancel();
}

#[cfg(not(unix))]
async fn cancel_on_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = ?e, "Ctrl-C handler unavailable, graceful shutdown disabled");
        return;
    }
    info!(signal = "ctrl-c", "Stopping health sidecar");
    shutdown.cancel();
}
