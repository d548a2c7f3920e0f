use crate::error::FeederError;
use crate::mastodon::MastodonApi;
use crate::sync::follow_set::FollowSetCache;
use crate::sync::timeline::profile_url_from_acct;
use tracing::{debug, info, warn};

/// Seeds the follow set from the following account's current follows
pub struct FollowBootstrap;

impl FollowBootstrap {
    /// Load every account the authenticated user follows.
    ///
    /// Any failure here is fatal for the process: starting with a partial
    /// follow set would send duplicate follow requests.
    pub async fn load<M>(client: &M, home_host: &str) -> Result<FollowSetCache, FeederError>
    where
        M: MastodonApi + ?Sized,
    {
        let me = client
            .verify_credentials()
            .await
            .map_err(FeederError::Bootstrap)?;

        info!(
            "Loading existing follows for {} (@{})",
            me.display_name, me.acct
        );

        let following = client
            .get_following(&me.id)
            .await
            .map_err(FeederError::Bootstrap)?;

        if following.is_empty() {
            warn!("No follows found");
        }

        let initial = following.into_iter().map(|account| {
            debug!("following user: {}, id: {}", account.acct, account.id);
            (profile_url_from_acct(&account.acct, home_host), account.id)
        });

        let follows = FollowSetCache::bootstrap(initial);
        info!("✓ Loaded {} existing follows", follows.len());
        Ok(follows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MastodonError;
    use crate::sync::fake::{account, FakeMastodon};
    use crate::sync::follow_set::FollowTarget;

    #[tokio::test]
    async fn test_load_maps_accts_to_profile_urls() {
        let client = FakeMastodon::new()
            .with_me(account("1", "feeder"))
            .with_following(vec![
                account("10", "bob@remote.example"),
                account("11", "alice"),
            ]);

        let follows = FollowBootstrap::load(&client, "home.example").await.unwrap();

        assert_eq!(follows.len(), 2);
        assert_eq!(
            follows.get("https://remote.example/@bob"),
            Some(&FollowTarget::Account("10".to_string()))
        );
        assert_eq!(
            follows.get("https://home.example/@alice"),
            Some(&FollowTarget::Account("11".to_string()))
        );
    }

    #[tokio::test]
    async fn test_load_with_no_follows() {
        let client = FakeMastodon::new()
            .with_me(account("1", "feeder"))
            .with_following(Vec::new());

        let follows = FollowBootstrap::load(&client, "home.example").await.unwrap();
        assert!(follows.is_empty());
    }

    #[tokio::test]
    async fn test_load_fails_when_following_unavailable() {
        let client = FakeMastodon::new().with_me(account("1", "feeder"));

        let err = FollowBootstrap::load(&client, "home.example")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FeederError::Bootstrap(MastodonError::ApiRequestFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_load_fails_without_credentials() {
        let client = FakeMastodon::new().with_following(Vec::new());

        let err = FollowBootstrap::load(&client, "home.example")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FeederError::Bootstrap(MastodonError::AuthenticationFailed(_))
        ));
    }
}
