pub mod bootstrap;
pub mod cycle;
pub mod follow_set;
pub mod resolver;
pub mod stats;
pub mod timeline;

#[cfg(test)]
pub(crate) mod fake;

use std::sync::Arc;
use tokio::sync::RwLock;

pub use cycle::{CyclePhase, ReconciliationCycle};
pub use follow_set::{FollowSetCache, FollowSnapshot, FollowTarget};
pub use resolver::IdentityResolver;
pub use stats::{CycleReport, CycleStats};
pub use timeline::TimelineProcessor;

/// State shared between the reconciliation cycle and the status endpoint
#[derive(Debug, Default)]
pub struct FeederState {
    pub follows: FollowSetCache,
    pub last_stats: Option<CycleStats>,
}

impl FeederState {
    pub fn new(follows: FollowSetCache) -> Self {
        Self {
            follows,
            last_stats: None,
        }
    }
}

pub type SharedState = Arc<RwLock<FeederState>>;

pub fn shared_state(follows: FollowSetCache) -> SharedState {
    Arc::new(RwLock::new(FeederState::new(follows)))
}
