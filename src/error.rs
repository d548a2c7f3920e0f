use crate::config::ConfigError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeederError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Mastodon API error: {0}")]
    Mastodon(#[from] MastodonError),

    #[error("Failed to load existing follows: {0}")]
    Bootstrap(MastodonError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),

    #[error("Application shutdown requested")]
    Shutdown,

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

#[derive(Error, Debug, Clone)]
pub enum MastodonError {
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    #[error("API request failed: {0}")]
    ApiRequestFailed(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Rate limit exceeded, retry after {retry_after} seconds")]
    RateLimitExceeded { retry_after: u64 },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Outcome of a failed profile lookup
#[derive(Error, Debug, Clone)]
pub enum ResolveError {
    /// The search worked but matched no account; never worth asking again
    #[error("No account found for {profile_url}")]
    NotFound { profile_url: String },

    /// The search itself failed; the author stays eligible for the next cycle
    #[error("Lookup failed for {profile_url}: {source}")]
    Lookup {
        profile_url: String,
        #[source]
        source: MastodonError,
    },
}

/// Error classification used by the startup path and the cycle's logging
pub struct ErrorRecovery;

impl ErrorRecovery {
    /// Whether the same operation may succeed if tried again later
    pub fn is_recoverable(error: &FeederError) -> bool {
        match error {
            FeederError::Mastodon(mastodon_error) => Self::is_transient(mastodon_error),
            FeederError::Io(_) => true,
            FeederError::Config(_)
            | FeederError::Bootstrap(_)
            | FeederError::TaskJoin(_)
            | FeederError::Shutdown
            | FeederError::InvalidData(_) => false,
        }
    }

    /// Whether a Mastodon failure is worth retrying on a later cycle
    pub fn is_transient(error: &MastodonError) -> bool {
        match error {
            MastodonError::ApiRequestFailed(_) => true,
            MastodonError::RateLimitExceeded { .. } => true,
            MastodonError::InvalidResponse(_) => true,
            MastodonError::AuthenticationFailed(_) => false,
            MastodonError::ClientBuild(_) => false,
        }
    }

    /// Determine if an error should cause application shutdown
    pub fn should_shutdown(error: &FeederError) -> bool {
        match error {
            FeederError::Config(_) => true,
            // A partial follow list would lead to duplicate follow requests
            FeederError::Bootstrap(_) => true,
            FeederError::Shutdown => true,
            FeederError::Mastodon(MastodonError::AuthenticationFailed(_)) => true,
            FeederError::Mastodon(MastodonError::ClientBuild(_)) => true,
            _ => false,
        }
    }
}
