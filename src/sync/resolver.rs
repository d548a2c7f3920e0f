use crate::error::ResolveError;
use crate::mastodon::MastodonApi;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Maps canonical profile URLs to account ids on the following instance.
///
/// Successful lookups are remembered here so a follow that failed can be
/// retried without searching again. Negative outcomes are remembered by
/// the caller in the follow set.
#[derive(Debug, Default)]
pub struct IdentityResolver {
    resolved: HashMap<String, String>,
}

impl IdentityResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up `profile_url` through the instance's account search
    pub async fn resolve<M>(&mut self, client: &M, profile_url: &str) -> Result<String, ResolveError>
    where
        M: MastodonApi + ?Sized,
    {
        if let Some(account_id) = self.resolved.get(profile_url) {
            debug!("Using remembered id {} for {}", account_id, profile_url);
            return Ok(account_id.clone());
        }

        debug!("Processing user: {}", profile_url);

        let accounts = client.search_accounts(profile_url).await.map_err(|e| {
            warn!("Error getting user id for {}: {}", profile_url, e);
            ResolveError::Lookup {
                profile_url: profile_url.to_string(),
                source: e,
            }
        })?;

        let Some(account) = accounts.into_iter().next() else {
            warn!("No results for {}", profile_url);
            return Err(ResolveError::NotFound {
                profile_url: profile_url.to_string(),
            });
        };

        info!("ADDING user: {}, id: {}", profile_url, account.id);
        self.resolved
            .insert(profile_url.to_string(), account.id.clone());
        Ok(account.id)
    }

    /// Drop the remembered id once the follow set owns the author
    pub fn forget(&mut self, profile_url: &str) {
        self.resolved.remove(profile_url);
    }

    /// Number of remembered positive lookups
    pub fn remembered(&self) -> usize {
        self.resolved.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::fake::FakeMastodon;

    #[tokio::test]
    async fn test_resolve_returns_first_match() {
        let client = FakeMastodon::new()
            .with_search_result("https://remote.example/@bob", &["acct-99", "acct-100"]);
        let mut resolver = IdentityResolver::new();

        let id = resolver
            .resolve(&client, "https://remote.example/@bob")
            .await
            .unwrap();

        assert_eq!(id, "acct-99");
        assert_eq!(resolver.remembered(), 1);
    }

    #[tokio::test]
    async fn test_resolve_not_found() {
        let client = FakeMastodon::new().with_search_result("https://remote.example/@ghost", &[]);
        let mut resolver = IdentityResolver::new();

        let err = resolver
            .resolve(&client, "https://remote.example/@ghost")
            .await
            .unwrap_err();

        assert!(matches!(err, ResolveError::NotFound { .. }));
        assert_eq!(resolver.remembered(), 0);
    }

    #[tokio::test]
    async fn test_resolve_lookup_error_is_not_remembered() {
        let client = FakeMastodon::new().with_search_failure("https://remote.example/@flaky");
        let mut resolver = IdentityResolver::new();

        let err = resolver
            .resolve(&client, "https://remote.example/@flaky")
            .await
            .unwrap_err();

        assert!(matches!(err, ResolveError::Lookup { .. }));
        assert_eq!(resolver.remembered(), 0);

        resolver
            .resolve(&client, "https://remote.example/@flaky")
            .await
            .unwrap_err();
        assert_eq!(client.search_calls().len(), 2);
    }

    #[tokio::test]
    async fn test_resolve_remembers_positive_result() {
        let client =
            FakeMastodon::new().with_search_result("https://remote.example/@bob", &["acct-99"]);
        let mut resolver = IdentityResolver::new();

        resolver
            .resolve(&client, "https://remote.example/@bob")
            .await
            .unwrap();
        let again = resolver
            .resolve(&client, "https://remote.example/@bob")
            .await
            .unwrap();

        assert_eq!(again, "acct-99");
        assert_eq!(client.search_calls(), vec!["https://remote.example/@bob"]);
    }

    #[tokio::test]
    async fn test_forget_drops_remembered_id() {
        let client =
            FakeMastodon::new().with_search_result("https://remote.example/@bob", &["acct-99"]);
        let mut resolver = IdentityResolver::new();

        resolver
            .resolve(&client, "https://remote.example/@bob")
            .await
            .unwrap();
        resolver.forget("https://remote.example/@bob");
        assert_eq!(resolver.remembered(), 0);

        resolver
            .resolve(&client, "https://remote.example/@bob")
            .await
            .unwrap();
        assert_eq!(client.search_calls().len(), 2);
    }
}
