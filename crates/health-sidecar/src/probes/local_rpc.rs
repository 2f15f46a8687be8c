use super::ProbeVerdict;
use crate::state::SharedState;
use tracing::info;

/// Passes while the last local height request succeeded.
#[derive(Debug)]
pub struct LocalRpcAvailable {
    state: SharedState,
}

impl LocalRpcAvailable {
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }

    pub(super) fn init(&self) {
        info!("[localRpcAvailable]: strategy configured");
    }

    pub fn verdict(&self) -> ProbeVerdict {
        let status = self.state.status();
        if !status.local_rpc_available {
            info!(
                last_local_height = status.last_local_height,
                "[localRpcAvailable]: Failing a health-check as local RPC is not available"
            );
            return ProbeVerdict::unhealthy(format!(
                "Local RPC is not available, reported height {}",
                status.last_local_height
            ));
        }

        ProbeVerdict::healthy("Local RPC is available.")
    }
}
