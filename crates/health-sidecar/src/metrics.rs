//! Prometheus metrics for the health sidecar.
//!
//! ## Metrics recorded
//!
//! ### Gauges
//! - `blockchain_local_node_height{chain_id}`: Last successful local height
//! - `blockchain_remote_node_height{chain_id}`: Last successful oracle height
//! - `blockchain_height_diff{chain_id, threshold}`: Oracle height minus local height
//!
//! ### Counters
//! - `blockchain_rpc_check_errors{destination, chain_id}`: Failed height requests,
//!   `destination` is `local` or the oracle URL
//! - `health_sidecar_ticks_total`: Completed check cycles
//!
//! ### Histograms
//! - `health_sidecar_tick_duration_seconds`: Wall-clock time of a check cycle
//!
//! With `INCLUDE_PROCESS_METRICS` the standard `process_*` series (CPU,
//! memory, open fds, threads) are sampled on every scrape.

#![allow(clippy::cast_precision_loss)]

use metrics::{
    counter,
    describe_counter,
    describe_gauge,
    describe_histogram,
    gauge,
    histogram,
};
use metrics_exporter_prometheus::{
    BuildError,
    PrometheusBuilder,
    PrometheusHandle,
};
use metrics_process::Collector;
use std::{
    fmt,
    sync::Arc,
    time::Duration,
};

pub const LOCAL_DESTINATION: &str = "local";

/// Installs the global Prometheus recorder and registers metric descriptions.
pub fn install() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    describe();
    Ok(handle)
}

/// Renders the `/metrics` body, refreshing process gauges first when enabled.
#[derive(Clone)]
pub struct MetricsExporter {
    handle: PrometheusHandle,
    process: Option<Arc<Collector>>,
}

impl MetricsExporter {
    pub fn new(handle: PrometheusHandle, include_process_metrics: bool) -> Self {
        let process = include_process_metrics.then(|| {
            let collector = Collector::default();
            collector.describe();
            Arc::new(collector)
        });
        Self { handle, process }
    }

    pub fn render(&self) -> String {
        if let Some(collector) = &self.process {
            collector.collect();
        }
        self.handle.render()
    }
}

impl fmt::Debug for MetricsExporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricsExporter")
            .field("process_metrics", &self.process.is_some())
            .finish_non_exhaustive()
    }
}

pub fn describe() {
    describe_gauge!("blockchain_local_node_height", "Local blockchain node height");
    describe_gauge!("blockchain_remote_node_height", "Remote blockchain node height");
    describe_gauge!(
        "blockchain_height_diff",
        "Difference between local and remote from sidecar point of view"
    );
    describe_counter!("blockchain_rpc_check_errors", "RPC checks errors");
    describe_counter!("health_sidecar_ticks_total", "Completed check cycles");
    describe_histogram!(
        "health_sidecar_tick_duration_seconds",
        metrics::Unit::Seconds,
        "Duration of a check cycle"
    );
}

pub fn record_local_height(chain_id: &str, height: i64) {
    gauge!("blockchain_local_node_height", "chain_id" => chain_id.to_owned()).set(height as f64);
}

pub fn record_remote_height(chain_id: &str, height: i64) {
    gauge!("blockchain_remote_node_height", "chain_id" => chain_id.to_owned()).set(height as f64);
}

pub fn record_height_diff(chain_id: &str, threshold: i64, diff: i64) {
    gauge!(
        "blockchain_height_diff",
        "chain_id" => chain_id.to_owned(),
        "threshold" => threshold.to_string()
    )
    .set(diff as f64);
}

pub fn record_rpc_failure(destination: &str, chain_id: &str) {
    counter!(
        "blockchain_rpc_check_errors",
        "destination" => destination.to_owned(),
        "chain_id" => chain_id.to_owned()
    )
    .increment(1);
}

pub fn record_tick(duration: Duration) {
    histogram!("health_sidecar_tick_duration_seconds").record(duration);
    counter!("health_sidecar_ticks_total").increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(include_process_metrics: bool) -> String {
        let recorder = PrometheusBuilder::new().build_recorder();
        metrics::with_local_recorder(&recorder, || {
            let exporter = MetricsExporter::new(recorder.handle(), include_process_metrics);
            record_tick(Duration::from_millis(5));
            exporter.render()
        })
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn process_metrics_are_rendered_when_enabled() {
        let body = render(true);
        assert!(body.contains("health_sidecar_ticks_total 1"));
        assert!(body.contains("process_resident_memory_bytes"));
        assert!(body.contains("process_cpu_seconds_total"));
    }

    #[test]
    fn process_metrics_are_off_by_default() {
        let body = render(false);
        assert!(body.contains("health_sidecar_ticks_total 1"));
        assert!(!body.contains("process_resident_memory_bytes"));
    }
}
