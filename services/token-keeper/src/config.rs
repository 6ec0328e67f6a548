//! Configuration types and loading
//!
//! Config precedence: env vars > config file > defaults.
//! The client secret is loaded from CLIENT_SECRET or client_secret_file,
//! never stored in the TOML directly to avoid leaking secrets.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use client_credentials::{TWITCH_TOKEN_ENDPOINT, TWITCH_TOKEN_PATTERN, TokenManager, TokenPattern};
use common::Secret;
use serde::Deserialize;

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
    /// Health/metrics listener; no server is started when absent
    #[serde(default)]
    pub server: Option<ServerConfig>,
}

/// Identity provider settings
#[derive(Debug, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_token_url")]
    pub token_url: String,
    #[serde(default = "default_token_pattern")]
    pub token_pattern: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// Client credentials
#[derive(Debug, Default, Deserialize)]
pub struct CredentialsConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(skip)]
    pub client_secret: Option<Secret<String>>,
    /// Path to a file containing the client secret (alternative to CLIENT_SECRET env var)
    #[serde(default)]
    pub client_secret_file: Option<PathBuf>,
}

/// Caller-side refresh policy
#[derive(Debug, Deserialize)]
pub struct RefreshConfig {
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
    /// Refresh once the token expires within this many seconds
    #[serde(default = "default_threshold")]
    pub threshold_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
}

fn default_token_url() -> String {
    TWITCH_TOKEN_ENDPOINT.to_owned()
}

fn default_token_pattern() -> String {
    TWITCH_TOKEN_PATTERN.to_owned()
}

fn default_timeout() -> u64 {
    10
}

fn default_interval() -> u64 {
    30
}

fn default_threshold() -> u64 {
    300
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            token_url: default_token_url(),
            token_pattern: default_token_pattern(),
            timeout_secs: default_timeout(),
        }
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            threshold_secs: default_threshold(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    ///
    /// Client secret resolution order:
    /// 1. CLIENT_SECRET env var
    /// 2. client_secret_file path from config
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        if let Ok(id) = std::env::var("CLIENT_ID") {
            config.credentials.client_id = id;
        }

        if let Ok(secret) = std::env::var("CLIENT_SECRET") {
            config.credentials.client_secret = Some(Secret::new(secret));
        } else if let Some(ref secret_file) = config.credentials.client_secret_file {
            let secret = std::fs::read_to_string(secret_file).map_err(|e| {
                common::Error::Config(format!(
                    "failed to read client_secret_file {}: {e}",
                    secret_file.display()
                ))
            })?;
            let secret = secret.trim().to_owned();
            if !secret.is_empty() {
                config.credentials.client_secret = Some(Secret::new(secret));
            }
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> common::Result<()> {
        if !self.provider.token_url.starts_with("http://")
            && !self.provider.token_url.starts_with("https://")
        {
            return Err(common::Error::Config(format!(
                "token_url must start with http:// or https://, got: {}",
                self.provider.token_url
            )));
        }

        if self.provider.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        if self.refresh.interval_secs == 0 {
            return Err(common::Error::Config(
                "interval_secs must be greater than 0".into(),
            ));
        }

        if self.credentials.client_id.trim().is_empty() {
            return Err(common::Error::Config(
                "client_id must be set in [credentials] or CLIENT_ID".into(),
            ));
        }

        match &self.credentials.client_secret {
            Some(secret) if !secret.is_blank() => Ok(()),
            _ => Err(common::Error::MissingSecret(
                "set CLIENT_SECRET or credentials.client_secret_file".into(),
            )),
        }
    }

    /// Build the token manager described by this configuration.
    pub fn build_manager(&self) -> client_credentials::Result<TokenManager> {
        let secret = self
            .credentials
            .client_secret
            .as_ref()
            .map(|s| s.expose().clone())
            .unwrap_or_default();

        TokenManager::builder(self.credentials.client_id.clone(), secret)
            .token_url(self.provider.token_url.clone())
            .pattern(TokenPattern::new(&self.provider.token_pattern)?)
            .timeout(Duration::from_secs(self.provider.timeout_secs))
            .build()
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh.interval_secs)
    }

    pub fn refresh_threshold(&self) -> Duration {
        Duration::from_secs(self.refresh.threshold_secs)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("token-keeper.toml")
    }
}
