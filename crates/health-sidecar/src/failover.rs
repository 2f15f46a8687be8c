//! Fallback semantics around a single height fetch.
//!
//! Failures never escape as errors: they are logged, counted and turned into
//! [`UNKNOWN_HEIGHT`] so callers only ever compare against zero.

use crate::{
    metrics::{
        self,
        LOCAL_DESTINATION,
    },
    state::{
        SharedState,
        UNKNOWN_HEIGHT,
    },
};
use height_client::{
    FetchError,
    HeightSource,
};
use tracing::{
    debug,
    error,
    warn,
};

#[derive(Debug, Clone)]
pub struct RpcFailover {
    state: SharedState,
}

impl RpcFailover {
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }

    /// Queries the local node once.
    ///
    /// Failures are only counted once the node has answered at least once, so
    /// a cold start does not inflate the error counter.
    pub async fn local<S: HeightSource>(&self, source: &S) -> i64 {
        let endpoint = self.state.local_endpoint();
        match fetch(source, endpoint).await {
            Ok(height) => height,
            Err(err) => {
                if self.state.status().local_rpc_initiated {
                    metrics::record_rpc_failure(LOCAL_DESTINATION, self.state.chain_id());
                }
                error!(error = %err, endpoint, "Local blockchain node is unavailable");
                UNKNOWN_HEIGHT
            }
        }
    }

    /// Walks the remote endpoints in configured order and returns the first
    /// height any of them reports.
    pub async fn remote<S: HeightSource>(&self, source: &S) -> i64 {
        let chain_id = self.state.chain_id();
        for endpoint in self.state.remote_endpoints() {
            match fetch(source, endpoint).await {
                Ok(height) => {
                    debug!(endpoint = %endpoint, height, "Remote height fetched");
                    return height;
                }
                Err(err) => {
                    metrics::record_rpc_failure(endpoint, chain_id);
                    warn!(error = %err, endpoint = %endpoint, "Remote endpoint is unavailable, trying next one");
                }
            }
        }

        error!(chain_id, "No remotes are available");
        UNKNOWN_HEIGHT
    }
}

async fn fetch<S: HeightSource>(source: &S, endpoint: &str) -> Result<i64, FetchError> {
    let height = source.fetch_height(endpoint).await?;
    i64::try_from(height).map_err(|_| FetchError::Malformed(format!("height {height} out of range")))
}
