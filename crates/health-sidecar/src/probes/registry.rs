use super::{
    CustomAvax,
    DriftTracker,
    HeightNotClimbing,
    LocalRpcAvailable,
    LocalVsRemote,
    ProbeKind,
    ProbeSettings,
    ProbeStrategy,
};
use crate::{
    error::ConfigError,
    state::SharedState,
};
use std::{
    collections::HashMap,
    fmt,
    sync::Arc,
};
use tracing::{
    error,
    info,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeRole {
    Readiness,
    Liveness,
    Startup,
}

impl ProbeRole {
    pub const ALL: [Self; 3] = [Self::Readiness, Self::Liveness, Self::Startup];

    pub fn name(self) -> &'static str {
        match self {
            Self::Readiness => "readiness",
            Self::Liveness => "liveness",
            Self::Startup => "startup",
        }
    }
}

impl fmt::Display for ProbeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Configured strategy name per role, exactly as given by the operator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleNames {
    pub readiness: Option<String>,
    pub liveness: Option<String>,
    pub startup: Option<String>,
}

impl RoleNames {
    pub fn get(&self, role: ProbeRole) -> Option<&str> {
        match role {
            ProbeRole::Readiness => self.readiness.as_deref(),
            ProbeRole::Liveness => self.liveness.as_deref(),
            ProbeRole::Startup => self.startup.as_deref(),
        }
    }
}

/// The strategy bound to each probe role.
///
/// Roles configured with the same strategy share one instance, so its
/// background work runs once per cycle and its state is seen by every role.
#[derive(Debug)]
pub struct ProbeRoles {
    readiness: Arc<ProbeStrategy>,
    liveness: Arc<ProbeStrategy>,
    startup: Arc<ProbeStrategy>,
}

impl ProbeRoles {
    pub fn select(
        names: &RoleNames,
        state: &SharedState,
        settings: &ProbeSettings,
    ) -> Result<Self, ConfigError> {
        let mut factory = StrategyFactory::new(state, settings);
        let readiness = factory.get(select_kind(ProbeRole::Readiness, names.readiness.as_deref()))?;
        let liveness = factory.get(select_kind(ProbeRole::Liveness, names.liveness.as_deref()))?;
        let startup = factory.get(select_kind(ProbeRole::Startup, names.startup.as_deref()))?;

        Ok(Self {
            readiness,
            liveness,
            startup,
        })
    }

    pub fn get(&self, role: ProbeRole) -> &Arc<ProbeStrategy> {
        match role {
            ProbeRole::Readiness => &self.readiness,
            ProbeRole::Liveness => &self.liveness,
            ProbeRole::Startup => &self.startup,
        }
    }

    /// Distinct strategies, in role order.
    pub fn unique(&self) -> Vec<Arc<ProbeStrategy>> {
        let mut unique: Vec<Arc<ProbeStrategy>> = Vec::with_capacity(ProbeRole::ALL.len());
        for role in ProbeRole::ALL {
            let strategy = self.get(role);
            if !unique.iter().any(|seen| seen.name() == strategy.name()) {
                unique.push(strategy.clone());
            }
        }
        unique
    }

    pub fn init(&self) -> Result<(), ConfigError> {
        for strategy in self.unique() {
            strategy.init()?;
        }
        for role in ProbeRole::ALL {
            info!(role = %role, strategy = self.get(role).name(), "probe configured");
        }
        Ok(())
    }
}

/// Resolves a configured name, falling back to `alwaysFailure` so a typo is
/// visible as failing probes rather than a crash loop.
fn select_kind(role: ProbeRole, name: Option<&str>) -> ProbeKind {
    let Some(name) = name else {
        error!(
            role = %role,
            available = %available_names(),
            "No probe strategy configured, falling back to alwaysFailure"
        );
        return ProbeKind::AlwaysFailure;
    };

    match name.parse() {
        Ok(kind) => kind,
        Err(err) => {
            error!(
                role = %role,
                error = %err,
                available = %available_names(),
                "Unknown probe strategy, falling back to alwaysFailure"
            );
            ProbeKind::AlwaysFailure
        }
    }
}

fn available_names() -> String {
    ProbeKind::ALL.map(ProbeKind::name).join(", ")
}

/// Builds at most one strategy per kind. `localVsRemote` and
/// `heightNotClimbing` share a single drift tracker.
struct StrategyFactory<'a> {
    state: &'a SharedState,
    settings: &'a ProbeSettings,
    drift: Arc<DriftTracker>,
    built: HashMap<ProbeKind, Arc<ProbeStrategy>>,
}

impl<'a> StrategyFactory<'a> {
    fn new(state: &'a SharedState, settings: &'a ProbeSettings) -> Self {
        Self {
            state,
            settings,
            drift: Arc::new(DriftTracker::new(settings.height_diff_threshold)),
            built: HashMap::new(),
        }
    }

    fn get(&mut self, kind: ProbeKind) -> Result<Arc<ProbeStrategy>, ConfigError> {
        if let Some(strategy) = self.built.get(&kind) {
            return Ok(strategy.clone());
        }

        let strategy = Arc::new(self.build(kind)?);
        self.built.insert(kind, strategy.clone());
        Ok(strategy)
    }

    fn build(&self, kind: ProbeKind) -> Result<ProbeStrategy, ConfigError> {
        let state = self.state.clone();
        let settings = self.settings;
        Ok(match kind {
            ProbeKind::AlwaysHealthy => ProbeStrategy::AlwaysHealthy,
            ProbeKind::AlwaysFailure => ProbeStrategy::AlwaysFailure,
            ProbeKind::LocalRpcAvailable => {
                ProbeStrategy::LocalRpcAvailable(LocalRpcAvailable::new(state))
            }
            ProbeKind::LocalVsRemote => {
                ProbeStrategy::LocalVsRemote(LocalVsRemote::new(
                    state,
                    self.drift.clone(),
                    settings.fail_on_remote_rpc_unavailable,
                ))
            }
            ProbeKind::HeightNotClimbing => {
                ProbeStrategy::HeightNotClimbing(HeightNotClimbing::new(
                    state,
                    self.drift.clone(),
                    settings.stale_height_check_history_length,
                    settings.count_local_rpc_fails_as_stale_height,
                    settings.ignore_halted_blockchain,
                ))
            }
            ProbeKind::CustomAvax => {
                ProbeStrategy::CustomAvax(CustomAvax::new(&settings.avax_health_endpoint)?)
            }
        })
    }
}
