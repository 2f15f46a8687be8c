//! Kubernetes health sidecar for blockchain nodes.
//!
//! Polls the local node and a list of oracles for their chain height on a
//! fixed interval and answers readiness, liveness and startup probes from the
//! cached observations.

#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod chains;
pub mod config;
pub mod error;
pub mod failover;
pub mod height_strategy;
pub mod metrics;
pub mod probes;
pub mod scheduler;
pub mod server;
pub mod service;
pub mod state;

#[cfg(test)]
mod test_util;

pub use config::Config;
pub use error::{
    ConfigError,
    ServerError,
};
pub use service::Sidecar;
pub use state::{
    SharedState,
    SidecarState,
};
