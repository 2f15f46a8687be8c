//! Health judgements behind the Kubernetes probe endpoints.
//!
//! A strategy has two halves. The background half runs once per check cycle
//! and may do I/O; it caches whatever the strategy needs. The verdict half
//! answers an HTTP probe from that cache and never blocks on the network.

mod avax;
mod drift;
mod history;
mod local_rpc;
mod registry;
mod stale_height;

pub use avax::{
    CustomAvax,
    DEFAULT_AVAX_HEALTH_ENDPOINT,
};
pub use drift::{
    DriftTracker,
    LocalVsRemote,
};
pub use history::HeightHistory;
pub use local_rpc::LocalRpcAvailable;
pub use registry::{
    ProbeRole,
    ProbeRoles,
    RoleNames,
};
pub use stale_height::HeightNotClimbing;

use crate::error::ConfigError;
use axum::{
    http::StatusCode,
    response::{
        IntoResponse,
        Response,
    },
};
use std::{
    fmt,
    str::FromStr,
};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeKind {
    AlwaysHealthy,
    AlwaysFailure,
    LocalRpcAvailable,
    LocalVsRemote,
    HeightNotClimbing,
    CustomAvax,
}

impl ProbeKind {
    pub const ALL: [Self; 6] = [
        Self::AlwaysHealthy,
        Self::AlwaysFailure,
        Self::HeightNotClimbing,
        Self::LocalVsRemote,
        Self::LocalRpcAvailable,
        Self::CustomAvax,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::AlwaysHealthy => "alwaysHealthy",
            Self::AlwaysFailure => "alwaysFailure",
            Self::LocalRpcAvailable => "localRpcAvailable",
            Self::LocalVsRemote => "localVsRemote",
            Self::HeightNotClimbing => "heightNotClimbing",
            Self::CustomAvax => "customAvax",
        }
    }
}

impl fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProbeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| format!("probe with name {s:?} not found"))
    }
}

/// Outcome of a probe request: status code plus a short human readable body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeVerdict {
    pub status: StatusCode,
    pub message: String,
}

impl ProbeVerdict {
    pub fn healthy(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            message: message.into(),
        }
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for ProbeVerdict {
    fn into_response(self) -> Response {
        (self.status, self.message).into_response()
    }
}

/// Knobs shared by the probe strategies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeSettings {
    pub height_diff_threshold: i64,
    pub fail_on_remote_rpc_unavailable: bool,
    pub stale_height_check_history_length: usize,
    pub count_local_rpc_fails_as_stale_height: bool,
    pub ignore_halted_blockchain: bool,
    pub avax_health_endpoint: String,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            height_diff_threshold: 100,
            fail_on_remote_rpc_unavailable: false,
            stale_height_check_history_length: 70,
            count_local_rpc_fails_as_stale_height: false,
            ignore_halted_blockchain: false,
            avax_health_endpoint: DEFAULT_AVAX_HEALTH_ENDPOINT.to_owned(),
        }
    }
}

#[derive(Debug)]
pub enum ProbeStrategy {
    AlwaysHealthy,
    /// Also stands in for roles whose configured strategy does not exist.
    AlwaysFailure,
    LocalRpcAvailable(LocalRpcAvailable),
    LocalVsRemote(LocalVsRemote),
    HeightNotClimbing(HeightNotClimbing),
    CustomAvax(CustomAvax),
}

impl ProbeStrategy {
    pub fn kind(&self) -> ProbeKind {
        match self {
            Self::AlwaysHealthy => ProbeKind::AlwaysHealthy,
            Self::AlwaysFailure => ProbeKind::AlwaysFailure,
            Self::LocalRpcAvailable(_) => ProbeKind::LocalRpcAvailable,
            Self::LocalVsRemote(_) => ProbeKind::LocalVsRemote,
            Self::HeightNotClimbing(_) => ProbeKind::HeightNotClimbing,
            Self::CustomAvax(_) => ProbeKind::CustomAvax,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    pub fn init(&self) -> Result<(), ConfigError> {
        match self {
            Self::AlwaysHealthy => Ok(()),
            Self::AlwaysFailure => {
                warn!("alwaysFailure strategy has been loaded. Is this intentional?");
                Ok(())
            }
            Self::LocalRpcAvailable(probe) => {
                probe.init();
                Ok(())
            }
            Self::LocalVsRemote(probe) => probe.init(),
            Self::HeightNotClimbing(probe) => probe.init(),
            Self::CustomAvax(probe) => {
                probe.init();
                Ok(())
            }
        }
    }

    pub fn has_background(&self) -> bool {
        matches!(
            self,
            Self::LocalVsRemote(_) | Self::HeightNotClimbing(_) | Self::CustomAvax(_)
        )
    }

    /// Runs the periodic half of the strategy, if it has one.
    pub async fn background(&self) {
        match self {
            Self::LocalVsRemote(probe) => probe.background(),
            Self::HeightNotClimbing(probe) => probe.background(),
            Self::CustomAvax(probe) => probe.background().await,
            Self::AlwaysHealthy | Self::AlwaysFailure | Self::LocalRpcAvailable(_) => {}
        }
    }

    pub fn verdict(&self) -> ProbeVerdict {
        match self {
            Self::AlwaysHealthy => ProbeVerdict::healthy("Always healthy"),
            Self::AlwaysFailure => ProbeVerdict::failure("Returning alwaysFailure strategy result"),
            Self::LocalRpcAvailable(probe) => probe.verdict(),
            Self::LocalVsRemote(probe) => probe.verdict(),
            Self::HeightNotClimbing(probe) => probe.verdict(),
            Self::CustomAvax(probe) => probe.verdict(),
        }
    }
}
