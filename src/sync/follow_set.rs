use std::collections::HashMap;
use std::fmt;
use tracing::debug;

/// Wire rendering of an author that was looked up and could not be resolved
pub const UNRESOLVABLE_MARKER: &str = "NaN";

/// What a profile URL is known to map to on the target instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FollowTarget {
    /// Followed, with the target-local account id
    Account(String),
    /// Looked up and confirmed absent; never searched again
    Unresolvable,
}

impl fmt::Display for FollowTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FollowTarget::Account(id) => f.write_str(id),
            FollowTarget::Unresolvable => f.write_str(UNRESOLVABLE_MARKER),
        }
    }
}

/// Diagnostic copy of the follow set, keys and values aligned pairwise
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FollowSnapshot {
    pub keys: Vec<String>,
    pub values: Vec<String>,
}

/// Every author already followed or known to be unresolvable, keyed by
/// canonical profile URL. Entries are only ever added.
#[derive(Debug, Clone, Default)]
pub struct FollowSetCache {
    entries: HashMap<String, FollowTarget>,
}

impl FollowSetCache {
    /// Build the cache from the account's existing follows
    pub fn bootstrap<I>(initial_follows: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let entries: HashMap<String, FollowTarget> = initial_follows
            .into_iter()
            .map(|(profile_url, account_id)| (profile_url, FollowTarget::Account(account_id)))
            .collect();

        debug!("Follow set bootstrapped with {} entries", entries.len());
        Self { entries }
    }

    pub fn contains(&self, profile_url: &str) -> bool {
        self.entries.contains_key(profile_url)
    }

    pub fn get(&self, profile_url: &str) -> Option<&FollowTarget> {
        self.entries.get(profile_url)
    }

    /// Insert or overwrite the mapping for `profile_url`
    pub fn record(&mut self, profile_url: impl Into<String>, target: FollowTarget) {
        let profile_url = profile_url.into();
        if let Some(previous) = self.entries.insert(profile_url.clone(), target) {
            debug!(
                "Overwrote follow set entry for {} (was {})",
                profile_url, previous
            );
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sorted copy of the entries for diagnostics
    pub fn snapshot(&self) -> FollowSnapshot {
        let mut pairs: Vec<(&String, &FollowTarget)> = self.entries.iter().collect();
        pairs.sort_by(|a, b| a.0.cmp(b.0));

        let (keys, values) = pairs
            .into_iter()
            .map(|(key, value)| {
                (
                    key.trim_end_matches('\n').to_string(),
                    value.to_string().trim_end_matches('\n').to_string(),
                )
            })
            .unzip();

        FollowSnapshot { keys, values }
    }
}
