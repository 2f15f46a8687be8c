use super::ProbeVerdict;
use crate::{
    error::ConfigError,
    metrics,
    state::SharedState,
};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{
    debug,
    info,
};

#[derive(Debug, Clone, Copy, Default)]
struct DriftStatus {
    current_diff: i64,
    initialized: bool,
}

/// Last measured distance between the oracles and the local node.
///
/// Owned by `localVsRemote`, read by `heightNotClimbing` to tell a halted
/// network from a stuck node.
#[derive(Debug)]
pub struct DriftTracker {
    threshold: i64,
    status: RwLock<DriftStatus>,
}

impl DriftTracker {
    pub fn new(threshold: i64) -> Self {
        Self {
            threshold,
            status: RwLock::new(DriftStatus::default()),
        }
    }

    pub fn threshold(&self) -> i64 {
        self.threshold
    }

    pub fn current_diff(&self) -> i64 {
        self.status.read().current_diff
    }

    pub fn is_initialized(&self) -> bool {
        self.status.read().initialized
    }

    /// True when the drift check is active and the last diff is tolerated.
    pub fn within_threshold(&self) -> bool {
        let status = *self.status.read();
        status.initialized && status.current_diff <= self.threshold
    }

    pub(super) fn mark_initialized(&self) {
        self.status.write().initialized = true;
    }

    fn record(&self, diff: i64) {
        self.status.write().current_diff = diff;
    }
}

/// Fails when the local node falls too far behind the oracles.
#[derive(Debug)]
pub struct LocalVsRemote {
    state: SharedState,
    drift: Arc<DriftTracker>,
    fail_on_remote_rpc_unavailable: bool,
}

impl LocalVsRemote {
    pub fn new(
        state: SharedState,
        drift: Arc<DriftTracker>,
        fail_on_remote_rpc_unavailable: bool,
    ) -> Self {
        Self {
            state,
            drift,
            fail_on_remote_rpc_unavailable,
        }
    }

    pub fn drift(&self) -> &Arc<DriftTracker> {
        &self.drift
    }

    pub(super) fn init(&self) -> Result<(), ConfigError> {
        if !self.state.perform_remote_checks() {
            return Err(ConfigError::RemoteEndpointsRequired {
                strategy: "localVsRemote",
            });
        }

        info!(
            fail_on_remote_rpc_unavailable = self.fail_on_remote_rpc_unavailable,
            diff_threshold = self.drift.threshold(),
            "[localVsRemote]: strategy configured"
        );
        self.drift.mark_initialized();
        Ok(())
    }

    pub fn background(&self) {
        let status = self.state.status();
        if status.last_local_height > 0 && status.last_remote_height > 0 {
            let diff = status.last_remote_height - status.last_local_height;
            self.drift.record(diff);
            metrics::record_height_diff(self.state.chain_id(), self.drift.threshold(), diff);
        }

        debug!(?status, current_diff = self.drift.current_diff(), "[localVsRemote]: check finished");
    }

    pub fn verdict(&self) -> ProbeVerdict {
        let status = self.state.status();
        let local = status.last_local_height;
        let remote = status.last_remote_height;
        let current_diff = self.drift.current_diff();
        let threshold = self.drift.threshold();

        if !status.local_rpc_available {
            info!(
                last_local_height = local,
                "[localVsRemote]: Failing a health-check as local RPC is not available"
            );
            return ProbeVerdict::unhealthy(format!("RPC not ready, reported height {local}"));
        }

        if status.remote_rpc_unstable {
            if self.fail_on_remote_rpc_unavailable {
                return ProbeVerdict::unhealthy(
                    "Remote RPC is unstable, and sidecar configured to fail checks when that happens.",
                );
            }
            return ProbeVerdict::healthy(format!(
                "Remote {remote}, local {local}, but ignoring the difference as remote RPC is unstable"
            ));
        }

        if local >= remote {
            return ProbeVerdict::healthy("Local node is higher or the same as remote.");
        }

        if current_diff <= threshold {
            return ProbeVerdict::healthy(format!(
                "The height difference is {current_diff}, which is acceptable. Threshold: {threshold}."
            ));
        }

        info!(
            last_local_height = local,
            last_remote_height = remote,
            current_diff,
            threshold,
            "[localVsRemote]: failing a health-check as node is behind"
        );
        ProbeVerdict::unhealthy(format!(
            "The node is behind, the difference is {current_diff}, allowed threshold: {threshold}."
        ))
    }
}
