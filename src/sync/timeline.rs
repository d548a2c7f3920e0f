use crate::mastodon::Status;
use crate::sync::follow_set::FollowSetCache;
use std::collections::HashSet;
use tracing::{debug, warn};
use url::Url;

/// Derive an author's canonical profile URL from one of their post URLs
/// by dropping the trailing status id segment.
///
/// `https://example.social/@alice/109876543210` becomes
/// `https://example.social/@alice`. Returns `None` for URLs that have no
/// path segment to drop or whose remainder is not an absolute URL.
pub fn canonical_profile_url(post_url: &str) -> Option<String> {
    let (profile, _status_id) = post_url.trim().rsplit_once('/')?;
    if profile.is_empty() {
        return None;
    }

    let parsed = Url::parse(profile).ok()?;
    if parsed.host_str().map_or(true, str::is_empty) {
        return None;
    }

    Some(profile.to_string())
}

/// Canonical profile URL for a followed account's `acct`.
///
/// Remote accounts carry their host (`user@host`); accounts local to the
/// following instance are bare usernames and live on `home_host`. Anything
/// that is not exactly `user@host` falls back to `home_host` with the part
/// before the first `@`.
pub fn profile_url_from_acct(acct: &str, home_host: &str) -> String {
    let parts: Vec<&str> = acct.split('@').collect();
    match parts.as_slice() {
        [user, host] if !host.is_empty() => format!("https://{host}/@{user}"),
        [user, ..] => format!("https://{home_host}/@{user}"),
        [] => format!("https://{home_host}/@{acct}"),
    }
}

/// Turns a timeline batch into the authors not yet followed
#[derive(Debug, Clone, Copy, Default)]
pub struct TimelineProcessor;

impl TimelineProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Profile URLs of authors in `posts` that `follows` does not contain.
    ///
    /// `posts` arrive newest first; they are walked oldest first and each
    /// author is emitted at most once per call.
    pub fn extract_candidates(&self, posts: &[Status], follows: &FollowSetCache) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();

        for post in posts.iter().rev() {
            let Some(post_url) = post.url.as_deref() else {
                warn!("Skipping status {} without a URL", post.id);
                continue;
            };

            let Some(profile_url) = canonical_profile_url(post_url) else {
                warn!("Skipping status {} with malformed URL: {}", post.id, post_url);
                continue;
            };

            if follows.contains(&profile_url) {
                debug!("SKIP -- Already following user: {}", profile_url);
                continue;
            }

            if seen.insert(profile_url.clone()) {
                candidates.push(profile_url);
            }
        }

        candidates
    }
}
