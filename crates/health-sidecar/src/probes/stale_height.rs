use super::{
    DriftTracker,
    HeightHistory,
    ProbeVerdict,
};
use crate::{
    error::ConfigError,
    state::SharedState,
};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{
    debug,
    info,
    warn,
};

/// Fails when the local height has not moved across the whole history window.
#[derive(Debug)]
pub struct HeightNotClimbing {
    state: SharedState,
    drift: Arc<DriftTracker>,
    history: Mutex<HeightHistory>,
    /// Push failed local fetches into the window instead of skipping them.
    count_local_rpc_fails_as_stale_height: bool,
    /// Tolerate a stuck node when the oracles look stuck too.
    ignore_halted_blockchain: bool,
}

impl HeightNotClimbing {
    pub fn new(
        state: SharedState,
        drift: Arc<DriftTracker>,
        history_length: usize,
        count_local_rpc_fails_as_stale_height: bool,
        ignore_halted_blockchain: bool,
    ) -> Self {
        Self {
            state,
            drift,
            history: Mutex::new(HeightHistory::new(history_length)),
            count_local_rpc_fails_as_stale_height,
            ignore_halted_blockchain,
        }
    }

    pub fn is_not_climbing(&self) -> bool {
        self.history.lock().is_not_climbing()
    }

    pub(super) fn init(&self) -> Result<(), ConfigError> {
        if !self.state.perform_remote_checks() {
            return Err(ConfigError::RemoteEndpointsRequired {
                strategy: "heightNotClimbing",
            });
        }

        let history_length = self.history.lock().capacity();
        let detection_secs = self.state.check_interval().as_secs() * history_length as u64;
        info!(
            history_length,
            count_local_rpc_fails_as_stale_height = self.count_local_rpc_fails_as_stale_height,
            ignore_halted_blockchain = self.ignore_halted_blockchain,
            detection_secs,
            "[heightNotClimbing]: strategy configured. Make sure the approximate time from first \
             block stuck to failing the check is larger than block time"
        );
        Ok(())
    }

    pub fn background(&self) {
        let status = self.state.status();
        if status.last_local_height <= 0 && !self.count_local_rpc_fails_as_stale_height {
            info!(
                "[heightNotClimbing]: Skipped - local node is not available and \
                 COUNT_LOCAL_RPC_FAILS_AS_STALE_HEIGHT is false"
            );
            return;
        }

        let mut history = self.history.lock();
        let was_not_climbing = history.is_not_climbing();
        history.push(status.last_local_height);

        if history.is_not_climbing() && !was_not_climbing {
            warn!(
                height = status.last_local_height,
                window = history.len(),
                "[heightNotClimbing]: All block heights in history are the same - the node is not climbing"
            );
        }
        debug!(?status, window = history.len(), "[heightNotClimbing]: check finished");
    }

    pub fn verdict(&self) -> ProbeVerdict {
        let status = self.state.status();

        if !status.local_rpc_available {
            info!(
                last_local_height = status.last_local_height,
                "[heightNotClimbing]: Failing a health-check as local RPC is not ready"
            );
            return ProbeVerdict::unhealthy(format!(
                "RPC not ready, last local height: {}",
                status.last_local_height
            ));
        }

        if !self.is_not_climbing() {
            return ProbeVerdict::healthy("OK");
        }

        // The oracles are failing as well and the last known drift is fine:
        // the whole network is probably halted, not just this node.
        if status.remote_rpc_unstable
            && self.ignore_halted_blockchain
            && self.drift.within_threshold()
        {
            info!("[heightNotClimbing]: node is not climbing, but the diff is OK - assuming network-wide issues");
            return ProbeVerdict::healthy(
                "The node is not climbing but this seems to be a network-wide issue.",
            );
        }

        ProbeVerdict::unhealthy("The node is not climbing")
    }
}
