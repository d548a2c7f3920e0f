use crate::sync::SharedState;
use serde::Serialize;

/// Body of `GET /healthz`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub last_count: usize,
    pub last_run: String,
}

/// Body of `GET /debug`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DebugReport {
    pub found_users: Vec<String>,
    pub followed_ids: Vec<String>,
}

/// Read-only view over the shared feeder state. Never triggers a cycle.
#[derive(Clone)]
pub struct StatusReporter {
    state: SharedState,
}

impl StatusReporter {
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }

    /// Latest cycle timestamp and the current follow set size
    pub async fn healthz(&self) -> HealthReport {
        let state = self.state.read().await;
        HealthReport {
            last_count: state.follows.len(),
            last_run: state
                .last_stats
                .as_ref()
                .map(|stats| stats.timestamp.clone())
                .unwrap_or_default(),
        }
    }

    pub async fn debug_report(&self) -> DebugReport {
        let snapshot = self.state.read().await.follows.snapshot();
        DebugReport {
            found_users: snapshot.keys,
            followed_ids: snapshot.values,
        }
    }
}
