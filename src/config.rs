use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use thiserror::Error;
use url::Url;

fn default_target_protocol() -> String {
    "https".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_interval_secs() -> u64 {
    60
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub target: TargetConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// The instance whose public timelines are watched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub server: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default)]
    pub access_token: String,
}

/// The instance hosting the account that does the following
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    #[serde(default = "default_target_protocol")]
    pub protocol: String,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default)]
    pub access_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub debug: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: Option<String>,
}

/// Connection settings for a single Mastodon API client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MastodonConfig {
    pub instance_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub access_token: String,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            protocol: default_target_protocol(),
            host: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            access_token: String::new(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            debug: false,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Some("info".to_string()),
        }
    }
}

/// Parse a boolean toggle the way the `DEBUG` variable has always worked:
/// any non-empty value turns it on, except explicit `0` or `false`.
fn parse_toggle(value: &str) -> bool {
    let value = value.trim();
    !(value.is_empty() || value == "0" || value.eq_ignore_ascii_case("false"))
}

impl Config {
    /// Load configuration from TOML file with XDG directory support and environment variable overrides
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let config_file = if let Some(path) = config_path {
            path
        } else {
            Self::find_config_file()
        };

        let mut config = if config_file.exists() {
            tracing::debug!("Loading config from: {}", config_file.display());
            let content = std::fs::read_to_string(&config_file)?;
            toml::from_str::<Config>(&content)?
        } else {
            tracing::debug!("No config file found, using environment variables only");
            Config::default()
        };

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Find configuration file using XDG directory support
    fn find_config_file() -> PathBuf {
        let current_dir_config = PathBuf::from("fedifeeder.toml");
        if current_dir_config.exists() {
            return current_dir_config;
        }

        let xdg_config = if let Ok(xdg_config_home) = env::var("XDG_CONFIG_HOME") {
            PathBuf::from(xdg_config_home)
                .join("fedifeeder")
                .join("fedifeeder.toml")
        } else if let Ok(home_dir) = env::var("HOME") {
            PathBuf::from(home_dir)
                .join(".config")
                .join("fedifeeder")
                .join("fedifeeder.toml")
        } else {
            PathBuf::new()
        };

        if xdg_config.exists() {
            return xdg_config;
        }

        current_dir_config
    }

    /// Apply environment variable overrides to configuration
    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| env::var(key).ok())
    }

    /// Apply overrides from any key lookup; the process environment in production
    fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Source connection
        if let Some(server) = lookup("MS_SOURCE_SERVER") {
            self.source.server = server;
        }
        if let Some(client_id) = lookup("MS_SOURCE_CLIENT_ID") {
            self.source.client_id = client_id;
        }
        if let Some(client_secret) = lookup("MS_SOURCE_CLIENT_SECRET") {
            self.source.client_secret = client_secret;
        }
        if let Some(access_token) = lookup("MS_SOURCE_ACCESS_TOKEN") {
            self.source.access_token = access_token;
        }

        // Target connection
        if let Some(protocol) = lookup("MS_TARGET_PROTOCOL") {
            self.target.protocol = protocol;
        }
        if let Some(host) = lookup("MS_TARGET_HOST") {
            self.target.host = host;
        }
        if let Some(client_id) = lookup("MS_TARGET_CLIENT_ID") {
            self.target.client_id = client_id;
        }
        if let Some(client_secret) = lookup("MS_TARGET_CLIENT_SECRET") {
            self.target.client_secret = client_secret;
        }
        if let Some(access_token) = lookup("MS_TARGET_ACCESS_TOKEN") {
            self.target.access_token = access_token;
        }

        // Status server
        if let Some(port) = lookup("PORT") {
            self.server.port = port.trim().parse().map_err(|_| {
                ConfigError::InvalidValue("PORT must be a valid port number".to_string())
            })?;
        }
        if let Some(debug) = lookup("DEBUG") {
            self.server.debug = parse_toggle(&debug);
        }

        // Sync schedule
        if let Some(interval) = lookup("FEDIFEEDER_SYNC_INTERVAL_SECS") {
            self.sync.interval_secs = interval.trim().parse().map_err(|_| {
                ConfigError::InvalidValue(
                    "FEDIFEEDER_SYNC_INTERVAL_SECS must be a valid number".to_string(),
                )
            })?;
        }

        // Logging configuration
        if let Some(level) = lookup("FEDIFEEDER_LOG_LEVEL") {
            self.logging.level = Some(level);
        }

        Ok(())
    }

    /// Validate that all required configuration is present
    fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            (&self.source.server, "source.server or MS_SOURCE_SERVER"),
            (&self.source.client_id, "source.client_id or MS_SOURCE_CLIENT_ID"),
            (
                &self.source.client_secret,
                "source.client_secret or MS_SOURCE_CLIENT_SECRET",
            ),
            (
                &self.source.access_token,
                "source.access_token or MS_SOURCE_ACCESS_TOKEN",
            ),
            (&self.target.protocol, "target.protocol or MS_TARGET_PROTOCOL"),
            (&self.target.host, "target.host or MS_TARGET_HOST"),
            (&self.target.client_id, "target.client_id or MS_TARGET_CLIENT_ID"),
            (
                &self.target.client_secret,
                "target.client_secret or MS_TARGET_CLIENT_SECRET",
            ),
            (
                &self.target.access_token,
                "target.access_token or MS_TARGET_ACCESS_TOKEN",
            ),
        ];

        for (value, name) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingRequired(name.to_string()));
            }
        }

        Url::parse(&self.source.server).map_err(|e| {
            ConfigError::InvalidValue(format!(
                "source.server is not a valid URL ({}): {e}",
                self.source.server
            ))
        })?;

        if !matches!(self.target.protocol.as_str(), "http" | "https") {
            return Err(ConfigError::InvalidValue(format!(
                "target.protocol must be http or https, got {}",
                self.target.protocol
            )));
        }

        Url::parse(&self.target_url()).map_err(|e| {
            ConfigError::InvalidValue(format!(
                "target.host does not form a valid URL ({}): {e}",
                self.target_url()
            ))
        })?;

        if self.sync.interval_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "sync.interval_secs must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Base URL of the target instance, composed from protocol and host
    pub fn target_url(&self) -> String {
        format!("{}://{}", self.target.protocol, self.target.host)
    }

    /// Connection settings for the timeline source
    pub fn source_connection(&self) -> MastodonConfig {
        MastodonConfig {
            instance_url: self.source.server.clone(),
            client_id: self.source.client_id.clone(),
            client_secret: self.source.client_secret.clone(),
            access_token: self.source.access_token.clone(),
        }
    }

    /// Connection settings for the following account
    pub fn target_connection(&self) -> MastodonConfig {
        MastodonConfig {
            instance_url: self.target_url(),
            client_id: self.target.client_id.clone(),
            client_secret: self.target.client_secret.clone(),
            access_token: self.target.access_token.clone(),
        }
    }

    pub fn sync_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.sync.interval_secs)
    }
}
