//! Configuration types and loading.
//!
//! Config is loaded once at startup from a JSON file (e.g. `~/.gourmet/config.json`) and
//! environment. Credentials from the environment override the file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Largest number of columns LINE accepts in a carousel template.
pub const MAX_CAROUSEL_COLUMNS: usize = 10;

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// HTTP server settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Messaging channel settings (LINE).
    #[serde(default)]
    pub channels: ChannelsConfig,

    /// Restaurant search API settings.
    #[serde(default)]
    pub search: SearchConfig,
}

/// Bind, port and upstream timeout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Port for the webhook and health endpoints (default 8080).
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bind address (default "0.0.0.0"; the platform must reach the webhook).
    #[serde(default = "default_gateway_bind")]
    pub bind: String,

    /// Per-call timeout for outbound requests (reply API, search API).
    #[serde(default = "default_upstream_timeout_secs")]
    pub upstream_timeout_secs: u64,

    /// Deadline for handling one webhook batch; events not reached in time get no reply.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_gateway_port() -> u16 {
    8080
}

fn default_gateway_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_upstream_timeout_secs() -> u64 {
    5
}

fn default_request_timeout_secs() -> u64 {
    10
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            bind: default_gateway_bind(),
            upstream_timeout_secs: default_upstream_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl GatewayConfig {
    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

/// Per-channel config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelsConfig {
    #[serde(default)]
    pub line: LineChannelConfig,
}

/// LINE Messaging API channel config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineChannelConfig {
    /// Channel secret used to verify X-Line-Signature. Overridden by LINE_SECRET_KEY env.
    pub channel_secret: Option<String>,
    /// Long-lived channel access token for the reply API. Overridden by LINE_ACCES_TOKEN
    /// (or LINE_ACCESS_TOKEN) env.
    pub channel_access_token: Option<String>,
    /// Messaging API base URL (default https://api.line.me). Tests point this at a mock.
    pub api_base: Option<String>,
}

/// Hot Pepper Gourmet search config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchConfig {
    /// API key. Overridden by HOTPEPPER_API_KEY env.
    pub api_key: Option<String>,
    /// API base URL; `/gourmet/v1/` is appended.
    pub base_url: Option<String>,
    /// Shops shown per carousel, clamped to 1..=10.
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

fn default_max_results() -> usize {
    MAX_CAROUSEL_COLUMNS
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            max_results: default_max_results(),
        }
    }
}

impl SearchConfig {
    pub fn column_limit(&self) -> usize {
        self.max_results.clamp(1, MAX_CAROUSEL_COLUMNS)
    }
}

/// Credentials the gateway cannot start without.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub channel_secret: String,
    pub channel_access_token: String,
    pub search_api_key: String,
}

/// Return the trimmed env value when non-blank, otherwise the trimmed config value when non-blank.
fn env_or_config(env_value: Option<String>, config_value: Option<&String>) -> Option<String> {
    env_value
        .and_then(|s| {
            let t = s.trim();
            if t.is_empty() {
                None
            } else {
                Some(t.to_string())
            }
        })
        .or_else(|| {
            config_value
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
}

/// Resolve the LINE channel secret: env LINE_SECRET_KEY overrides config.
pub fn resolve_channel_secret(config: &Config) -> Option<String> {
    env_or_config(
        std::env::var("LINE_SECRET_KEY").ok(),
        config.channels.line.channel_secret.as_ref(),
    )
}

/// Resolve the LINE channel access token. The misspelled LINE_ACCES_TOKEN is read first so
/// existing `.env` files keep working; LINE_ACCESS_TOKEN is accepted as well.
pub fn resolve_channel_access_token(config: &Config) -> Option<String> {
    let env = std::env::var("LINE_ACCES_TOKEN")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .or_else(|| std::env::var("LINE_ACCESS_TOKEN").ok());
    env_or_config(env, config.channels.line.channel_access_token.as_ref())
}

/// Resolve the Hot Pepper API key: env HOTPEPPER_API_KEY overrides config.
pub fn resolve_search_api_key(config: &Config) -> Option<String> {
    env_or_config(
        std::env::var("HOTPEPPER_API_KEY").ok(),
        config.search.api_key.as_ref(),
    )
}

/// Resolve every credential, failing with the names of the missing ones.
pub fn resolve_credentials(config: &Config) -> Result<Credentials> {
    collect_credentials(
        resolve_channel_secret(config),
        resolve_channel_access_token(config),
        resolve_search_api_key(config),
    )
}

fn collect_credentials(
    channel_secret: Option<String>,
    channel_access_token: Option<String>,
    search_api_key: Option<String>,
) -> Result<Credentials> {
    let mut missing = Vec::new();
    if channel_secret.is_none() {
        missing.push("LINE_SECRET_KEY (channels.line.channelSecret)");
    }
    if channel_access_token.is_none() {
        missing.push("LINE_ACCES_TOKEN (channels.line.channelAccessToken)");
    }
    if search_api_key.is_none() {
        missing.push("HOTPEPPER_API_KEY (search.apiKey)");
    }
    match (channel_secret, channel_access_token, search_api_key) {
        (Some(channel_secret), Some(channel_access_token), Some(search_api_key)) => {
            Ok(Credentials {
                channel_secret,
                channel_access_token,
                search_api_key,
            })
        }
        _ => anyhow::bail!("missing credentials: {}", missing.join(", ")),
    }
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("GOURMET_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".gourmet").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Load config from the given path, GOURMET_CONFIG_PATH, or the default. Missing file => default config.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}
