use crate::error::{ErrorRecovery, ResolveError};
use crate::mastodon::{MastodonApi, Status, TimelineScope};
use crate::sync::follow_set::FollowTarget;
use crate::sync::resolver::IdentityResolver;
use crate::sync::stats::{CycleReport, CycleStats};
use crate::sync::timeline::TimelineProcessor;
use crate::sync::SharedState;
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, info, trace, warn};

/// Timelines read from the source instance, in the order they are processed
const SCOPES: [TimelineScope; 2] = [TimelineScope::Federated, TimelineScope::Local];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Idle,
    FetchingRemote,
    Processing,
    Resolving,
    Following,
}

impl fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CyclePhase::Idle => "idle",
            CyclePhase::FetchingRemote => "fetching remote",
            CyclePhase::Processing => "processing",
            CyclePhase::Resolving => "resolving",
            CyclePhase::Following => "following",
        };
        f.write_str(name)
    }
}

/// One reconciliation pass: read the source timelines and follow every
/// new author from the target account.
pub struct ReconciliationCycle<S, T> {
    source: S,
    target: T,
    processor: TimelineProcessor,
    resolver: IdentityResolver,
    state: SharedState,
    phase: CyclePhase,
}

impl<S, T> ReconciliationCycle<S, T>
where
    S: MastodonApi,
    T: MastodonApi,
{
    pub fn new(source: S, target: T, state: SharedState) -> Self {
        Self {
            source,
            target,
            processor: TimelineProcessor::new(),
            resolver: IdentityResolver::new(),
            state,
            phase: CyclePhase::Idle,
        }
    }

    pub fn phase(&self) -> CyclePhase {
        self.phase
    }

    fn transition(&mut self, next: CyclePhase) {
        trace!("Cycle phase: {} -> {}", self.phase, next);
        self.phase = next;
    }

    /// Run one full cycle. Individual failures are logged and counted;
    /// nothing here aborts the cycle.
    pub async fn run(&mut self) -> CycleReport {
        let mut report = CycleReport::default();

        self.transition(CyclePhase::FetchingRemote);
        let mut batches = Vec::with_capacity(SCOPES.len());
        for scope in SCOPES {
            batches.push(self.fetch_batch(scope, &mut report).await);
        }

        // Authors attempted this cycle, whatever the outcome
        let mut attempted = HashSet::new();

        for posts in batches {
            self.transition(CyclePhase::Processing);
            report.posts_seen += posts.len();

            let candidates = {
                let state = self.state.read().await;
                self.processor.extract_candidates(&posts, &state.follows)
            };

            for profile_url in candidates {
                if !attempted.insert(profile_url.clone()) {
                    continue;
                }
                report.candidates += 1;
                self.reconcile_author(&profile_url, &mut report).await;
            }
        }

        let stats = {
            let mut state = self.state.write().await;
            let stats = CycleStats::now(state.follows.len());
            state.last_stats = Some(stats.clone());
            stats
        };
        report.follow_count = stats.follow_count;

        self.transition(CyclePhase::Idle);
        debug!(follows_found = stats.follow_count, "Cycle finished");
        report
    }

    async fn fetch_batch(&self, scope: TimelineScope, report: &mut CycleReport) -> Vec<Status> {
        match self.source.public_timeline(scope).await {
            Ok(posts) => posts,
            Err(e) => {
                warn!("Error getting remote {} timeline: {}", scope, e);
                report.fetch_failures += 1;
                Vec::new()
            }
        }
    }

    /// Resolve and follow a single author, recording the outcome
    async fn reconcile_author(&mut self, profile_url: &str, report: &mut CycleReport) {
        self.transition(CyclePhase::Resolving);

        let account_id = match self.resolver.resolve(&self.target, profile_url).await {
            Ok(account_id) => account_id,
            Err(ResolveError::NotFound { .. }) => {
                self.record(profile_url, FollowTarget::Unresolvable).await;
                report.unresolvable += 1;
                return;
            }
            Err(ResolveError::Lookup { source, .. }) => {
                debug!(
                    "Leaving {} for the next cycle (transient: {})",
                    profile_url,
                    ErrorRecovery::is_transient(&source)
                );
                report.lookup_failures += 1;
                return;
            }
        };

        self.transition(CyclePhase::Following);
        match self.target.follow_account(&account_id).await {
            Ok(relationship) => {
                debug!(
                    "FOLLOWING -- {} (following: {}, requested: {})",
                    profile_url, relationship.following, relationship.requested
                );
                self.record(profile_url, FollowTarget::Account(account_id))
                    .await;
                self.resolver.forget(profile_url);
                report.followed += 1;
            }
            Err(e) => {
                warn!(
                    "Failed to follow {} ({}): {}; will retry next cycle",
                    profile_url, account_id, e
                );
                report.follow_failures += 1;
            }
        }
    }

    async fn record(&self, profile_url: &str, target: FollowTarget) {
        self.state.write().await.follows.record(profile_url, target);
    }
}

impl<S, T> ReconciliationCycle<S, T> {
    pub fn state(&self) -> &SharedState {
        &self.state
    }
}

pub(crate) fn log_report(report: &CycleReport) {
    info!(
        posts = report.posts_seen,
        candidates = report.candidates,
        followed = report.followed,
        unresolvable = report.unresolvable,
        lookup_failures = report.lookup_failures,
        follow_failures = report.follow_failures,
        fetch_failures = report.fetch_failures,
        follow_count = report.follow_count,
        "Reconciliation cycle complete"
    );
}
