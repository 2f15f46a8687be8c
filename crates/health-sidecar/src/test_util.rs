//! Helpers shared by unit tests.

use crate::state::{
    SharedState,
    SidecarState,
};
use metrics_util::{
    CompositeKey,
    MetricKind,
    debugging::{
        DebugValue,
        DebuggingRecorder,
    },
};
use std::{
    future::Future,
    time::Duration,
};

pub(crate) const CHAIN_ID: &str = "0021";

pub(crate) fn shared_state(local: &str, remotes: &[&str]) -> SharedState {
    SidecarState::new(
        CHAIN_ID,
        local,
        remotes.iter().map(ToString::to_string).collect(),
        Duration::from_secs(15),
    )
    .shared()
}

/// Metrics recorded while running `fut` on a fresh current-thread runtime.
pub(crate) struct Recorded<T> {
    pub output: T,
    snapshot: Vec<(CompositeKey, DebugValue)>,
}

impl<T> Recorded<T> {
    fn find(&self, kind: MetricKind, name: &str, labels: &[(&str, &str)]) -> Option<&DebugValue> {
        self.snapshot
            .iter()
            .find(|(key, _)| {
                key.kind() == kind
                    && key.key().name() == name
                    && labels.iter().all(|(k, v)| {
                        key.key()
                            .labels()
                            .any(|label| label.key() == *k && label.value() == *v)
                    })
            })
            .map(|(_, value)| value)
    }

    pub fn counter(&self, name: &str, labels: &[(&str, &str)]) -> u64 {
        match self.find(MetricKind::Counter, name, labels) {
            Some(DebugValue::Counter(value)) => *value,
            _ => 0,
        }
    }

    pub fn gauge(&self, name: &str, labels: &[(&str, &str)]) -> Option<f64> {
        match self.find(MetricKind::Gauge, name, labels) {
            Some(DebugValue::Gauge(value)) => Some(value.into_inner()),
            _ => None,
        }
    }
}

pub(crate) fn with_recorder<F, Fut, T>(f: F) -> Recorded<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = T>,
{
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    let output = metrics::with_local_recorder(&recorder, || {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("create tokio runtime");
        runtime.block_on(f())
    });

    let snapshot = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(key, _, _, value)| (key, value))
        .collect();

    Recorded { output, snapshot }
}
