use crate::config::MastodonConfig;
use crate::error::MastodonError;
use async_trait::async_trait;
use reqwest::header::{LINK, RETRY_AFTER};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Page size requested for the public timelines
const TIMELINE_LIMIT: u32 = 40;

/// Largest page the following endpoint hands out
const FOLLOWING_PAGE_LIMIT: u32 = 80;

/// Mastodon account information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub acct: String,
    #[serde(default)]
    pub display_name: String,
}

/// The part of a timeline status the feeder reads
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Status {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// Relationship returned after a follow request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    pub id: String,
    #[serde(default)]
    pub following: bool,
    #[serde(default)]
    pub requested: bool,
}

#[derive(Debug, Deserialize)]
struct SearchResults {
    #[serde(default)]
    accounts: Vec<Account>,
}

/// Which public timeline to read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimelineScope {
    /// Everything the instance knows about, local and remote
    Federated,
    /// Only posts from accounts on the instance itself
    Local,
}

impl fmt::Display for TimelineScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimelineScope::Federated => write!(f, "non-local public"),
            TimelineScope::Local => write!(f, "local public"),
        }
    }
}

/// The slice of the Mastodon API the feeder needs
#[async_trait]
pub trait MastodonApi: Send + Sync {
    async fn verify_credentials(&self) -> Result<Account, MastodonError>;
    async fn get_following(&self, account_id: &str) -> Result<Vec<Account>, MastodonError>;
    async fn public_timeline(&self, scope: TimelineScope) -> Result<Vec<Status>, MastodonError>;
    async fn search_accounts(&self, query: &str) -> Result<Vec<Account>, MastodonError>;
    async fn follow_account(&self, account_id: &str) -> Result<Relationship, MastodonError>;
}

/// Mastodon REST client
#[derive(Clone)]
pub struct MastodonClient {
    config: MastodonConfig,
    http_client: reqwest::Client,
}

impl MastodonClient {
    /// Create a new Mastodon client
    pub fn new(config: MastodonConfig) -> Result<Self, MastodonError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(format!("fedifeeder/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| MastodonError::ClientBuild(e.to_string()))?;

        debug!(
            "Created Mastodon client for {} (client id: {})",
            config.instance_url, config.client_id
        );

        Ok(Self {
            config,
            http_client,
        })
    }

    pub fn instance_url(&self) -> &str {
        self.config.instance_url.trim_end_matches('/')
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.instance_url(), path)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        action: &str,
    ) -> Result<T, MastodonError> {
        debug!("GET {} ({})", url, action);

        let response = self
            .http_client
            .get(url)
            .bearer_auth(&self.config.access_token)
            .query(query)
            .send()
            .await
            .map_err(|e| MastodonError::ApiRequestFailed(format!("Failed to {action}: {e}")))?;

        let response = Self::check_status(response, action).await?;
        Self::decode(response, action).await
    }

    /// Map non-success HTTP statuses onto error variants
    async fn check_status(
        response: reqwest::Response,
        action: &str,
    ) -> Result<reqwest::Response, MastodonError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(60);
            warn!("Rate limited while trying to {action}, retry after {retry_after}s");
            return Err(MastodonError::RateLimitExceeded { retry_after });
        }

        let error_text = response.text().await.unwrap_or_default();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(MastodonError::AuthenticationFailed(format!(
                "{action} was rejected with status {status}: {error_text}"
            )));
        }

        Err(MastodonError::ApiRequestFailed(format!(
            "{action} failed with status {status}: {error_text}"
        )))
    }

    async fn decode<T: DeserializeOwned>(
        response: reqwest::Response,
        action: &str,
    ) -> Result<T, MastodonError> {
        response.json().await.map_err(|e| {
            MastodonError::InvalidResponse(format!("Failed to parse response to {action}: {e}"))
        })
    }
}

/// Extract the `rel="next"` target from a `Link` header
pub(crate) fn parse_next_link(header: &str) -> Option<String> {
    header.split(',').find_map(|entry| {
        let (target, params) = entry.split_once(';')?;
        let is_next = params
            .split(';')
            .map(str::trim)
            .any(|param| param == "rel=\"next\"" || param == "rel=next");
        if !is_next {
            return None;
        }

        target
            .trim()
            .strip_prefix('<')
            .and_then(|t| t.strip_suffix('>'))
            .map(str::to_string)
    })
}

#[async_trait]
impl MastodonApi for MastodonClient {
    /// Verify the access token and return the account it belongs to
    async fn verify_credentials(&self) -> Result<Account, MastodonError> {
        let url = self.endpoint("/api/v1/accounts/verify_credentials");
        let account: Account = self.get_json(&url, &[], "verify credentials").await?;

        info!(
            "Credentials verified for user: {} (@{})",
            account.display_name, account.acct
        );
        Ok(account)
    }

    /// Fetch every account followed by `account_id`, walking all pages
    async fn get_following(&self, account_id: &str) -> Result<Vec<Account>, MastodonError> {
        let mut next = Some(format!(
            "{}?limit={FOLLOWING_PAGE_LIMIT}",
            self.endpoint(&format!("/api/v1/accounts/{account_id}/following"))
        ));
        let mut accounts = Vec::new();
        let mut pages = 0u32;

        while let Some(url) = next.take() {
            debug!("Fetching following page: {}", url);

            let response = self
                .http_client
                .get(&url)
                .bearer_auth(&self.config.access_token)
                .send()
                .await
                .map_err(|e| {
                    MastodonError::ApiRequestFailed(format!("Failed to fetch following: {e}"))
                })?;

            let response = Self::check_status(response, "fetch following").await?;
            next = response
                .headers()
                .get(LINK)
                .and_then(|h| h.to_str().ok())
                .and_then(parse_next_link)
                .filter(|next_url| *next_url != url);

            let page: Vec<Account> = Self::decode(response, "fetch following").await?;
            pages += 1;
            if page.is_empty() {
                break;
            }
            accounts.extend(page);
        }

        debug!(
            "Fetched {} followed accounts over {} pages",
            accounts.len(),
            pages
        );
        Ok(accounts)
    }

    /// Fetch one page of a public timeline, newest first
    async fn public_timeline(&self, scope: TimelineScope) -> Result<Vec<Status>, MastodonError> {
        let url = self.endpoint("/api/v1/timelines/public");
        let mut query = vec![("limit", TIMELINE_LIMIT.to_string())];
        if scope == TimelineScope::Local {
            query.push(("local", "true".to_string()));
        }

        // Decode entry by entry so one odd status does not cost the whole page
        let entries: Vec<serde_json::Value> = self
            .get_json(&url, &query, &format!("fetch {scope} timeline"))
            .await?;

        let total = entries.len();
        let statuses: Vec<Status> = entries
            .into_iter()
            .filter_map(|entry| match serde_json::from_value::<Status>(entry) {
                Ok(status) => Some(status),
                Err(e) => {
                    warn!("Skipping undecodable status in {} timeline: {}", scope, e);
                    None
                }
            })
            .collect();

        debug!(
            "Fetched {} of {} statuses from {} timeline",
            statuses.len(),
            total,
            scope
        );
        Ok(statuses)
    }

    /// Search for accounts matching `query`, asking the instance to resolve remote ones
    async fn search_accounts(&self, query: &str) -> Result<Vec<Account>, MastodonError> {
        let url = self.endpoint("/api/v2/search");
        let params = [
            ("q", query.to_string()),
            ("type", "accounts".to_string()),
            ("resolve", "true".to_string()),
        ];

        let results: SearchResults = self.get_json(&url, &params, "search accounts").await?;
        debug!("Accounts found for {}: {}", query, results.accounts.len());
        Ok(results.accounts)
    }

    async fn follow_account(&self, account_id: &str) -> Result<Relationship, MastodonError> {
        let url = self.endpoint(&format!("/api/v1/accounts/{account_id}/follow"));
        debug!("POST {}", url);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.config.access_token)
            .send()
            .await
            .map_err(|e| {
                MastodonError::ApiRequestFailed(format!("Failed to follow {account_id}: {e}"))
            })?;

        let response = Self::check_status(response, "follow account").await?;
        Self::decode(response, "follow account").await
    }
}
