//! Latest observations about the local node and its oracles.
//!
//! Heights are only written by the check scheduler. Everything else reads a
//! [`HeightStatus`] copy, which always reflects one completed update.

use parking_lot::RwLock;
use std::{
    sync::Arc,
    time::Duration,
};

/// Height reported when a fetch failed. Any value `<= 0` means "unknown".
pub const UNKNOWN_HEIGHT: i64 = -1;

pub type SharedState = Arc<SidecarState>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeightStatus {
    pub last_local_height: i64,
    pub last_remote_height: i64,
    /// Last local request succeeded.
    pub local_rpc_available: bool,
    /// At least one local request ever succeeded. Never reset.
    pub local_rpc_initiated: bool,
    /// Last remote request failed on every oracle.
    pub remote_rpc_unstable: bool,
}

impl Default for HeightStatus {
    fn default() -> Self {
        Self {
            last_local_height: UNKNOWN_HEIGHT,
            last_remote_height: UNKNOWN_HEIGHT,
            local_rpc_available: false,
            local_rpc_initiated: false,
            remote_rpc_unstable: false,
        }
    }
}

#[derive(Debug)]
pub struct SidecarState {
    chain_id: String,
    local_endpoint: String,
    remote_endpoints: Vec<String>,
    perform_remote_checks: bool,
    check_interval: Duration,
    status: RwLock<HeightStatus>,
}

impl SidecarState {
    pub fn new(
        chain_id: impl Into<String>,
        local_endpoint: impl Into<String>,
        remote_endpoints: Vec<String>,
        check_interval: Duration,
    ) -> Self {
        let perform_remote_checks = !remote_endpoints.is_empty();
        Self {
            chain_id: chain_id.into(),
            local_endpoint: local_endpoint.into(),
            remote_endpoints,
            perform_remote_checks,
            check_interval,
            status: RwLock::new(HeightStatus::default()),
        }
    }

    pub fn shared(self) -> SharedState {
        Arc::new(self)
    }

    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    pub fn local_endpoint(&self) -> &str {
        &self.local_endpoint
    }

    pub fn remote_endpoints(&self) -> &[String] {
        &self.remote_endpoints
    }

    pub fn perform_remote_checks(&self) -> bool {
        self.perform_remote_checks
    }

    pub fn check_interval(&self) -> Duration {
        self.check_interval
    }

    pub fn status(&self) -> HeightStatus {
        *self.status.read()
    }

    /// Stores the outcome of a local fetch and returns the status before it.
    pub fn record_local_height(&self, height: i64) -> HeightStatus {
        let mut status = self.status.write();
        let previous = *status;
        status.last_local_height = height;
        status.local_rpc_available = height > 0;
        if height > 0 {
            status.local_rpc_initiated = true;
        }
        previous
    }

    /// Stores the outcome of a remote fetch and returns the status before it.
    pub fn record_remote_height(&self, height: i64) -> HeightStatus {
        let mut status = self.status.write();
        let previous = *status;
        status.last_remote_height = height;
        status.remote_rpc_unstable = height <= 0;
        previous
    }

    #[cfg(test)]
    pub(crate) fn set_status(&self, status: HeightStatus) {
        *self.status.write() = status;
    }
}
