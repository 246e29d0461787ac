use std::collections::HashMap;
use std::time::Duration;

use ::config::builder::DefaultState;
use ::config::ConfigBuilder;
use enrichment::adapters::token_list::SOLANA_TOKEN_LIST_URL;
use enrichment::RetryPolicy;

#[derive(Debug, serde::Deserialize, Clone)]
pub struct BotConfig {
    #[serde(alias = "RPC_URL")]
    pub rpc_url: String,
    #[serde(alias = "WS_URL")]
    pub ws_url: String,
    #[serde(alias = "DISCORD_BOT_TOKEN")]
    pub discord_bot_token: String,
    #[serde(alias = "MORALIS_API_KEY", default)]
    pub moralis_api_key: Option<String>,
    #[serde(alias = "TOKEN_LIST_URL", default = "default_token_list_url")]
    pub token_list_url: String,
    #[serde(alias = "QUEUE_DELAY_MS", default = "default_queue_delay_ms")]
    pub queue_delay_ms: u64,
    #[serde(alias = "PAIR_RETRY_ATTEMPTS", default = "default_pair_retry_attempts")]
    pub pair_retry_attempts: u32,
    #[serde(alias = "PAIR_RETRY_DELAY_SECS", default = "default_pair_retry_delay_secs")]
    pub pair_retry_delay_secs: u64,
    #[serde(alias = "HEARTBEAT_INTERVAL_SECS", default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,
    #[serde(alias = "HEARTBEAT_TIMEOUT_SECS", default = "default_heartbeat_timeout_secs")]
    pub heartbeat_timeout_secs: u64,
    #[serde(alias = "HTTP_TIMEOUT_SECS", default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    #[serde(alias = "METRICS_PORT", default)]
    pub metrics_port: Option<u16>,
    /// Notification destination per source target key, e.g. DISCORD_CHANNEL_ID_BONK_MIGRATION -> channel id
    #[serde(skip)]
    pub destinations: HashMap<String, String>,
}

fn default_token_list_url() -> String { SOLANA_TOKEN_LIST_URL.to_string() }
fn default_queue_delay_ms() -> u64 { 5_000 }
fn default_pair_retry_attempts() -> u32 { 30 }
fn default_pair_retry_delay_secs() -> u64 { 30 }
fn default_heartbeat_interval_secs() -> u64 { 15 }
fn default_heartbeat_timeout_secs() -> u64 { 10 }
fn default_http_timeout_secs() -> u64 { 10 }

impl BotConfig {
    /// Loads from the process environment. `target_keys` are the destination keys
    /// of the configured sources; each one present is captured into `destinations`.
    pub fn new(target_keys: &[&str]) -> Result<Self, String> {
        let builder = ::config::Config::builder().add_source(::config::Environment::default());
        let config = Self::load(builder, target_keys)?;
        config.validate()?;
        Ok(config)
    }

    pub(crate) fn load(builder: ConfigBuilder<DefaultState>, target_keys: &[&str]) -> Result<Self, String> {
        let s = builder
            .build()
            .map_err(|e| format!("Config Build Error: {}", e))?;

        let mut config: BotConfig = s
            .clone()
            .try_deserialize()
            .map_err(|e| format!("Config Deserialize Error: {}", e))?;

        // Environment keys are lower-cased by the loader
        for key in target_keys {
            if let Ok(value) = s.get_string(&key.to_lowercase()) {
                let value = value.trim().to_string();
                if !value.is_empty() {
                    config.destinations.insert((*key).to_string(), value);
                }
            }
        }

        Ok(config)
    }

    /// Validates configuration values at startup (Fail Fast)
    pub fn validate(&self) -> Result<(), String> {
        if !self.rpc_url.starts_with("http") {
            return Err(format!("Invalid RPC_URL: must start with http/https. Got: {}", self.rpc_url));
        }
        if !self.ws_url.starts_with("ws") {
            return Err(format!("Invalid WS_URL: must start with ws/wss. Got: {}", self.ws_url));
        }
        if self.discord_bot_token.trim().is_empty() {
            return Err("DISCORD_BOT_TOKEN cannot be empty".into());
        }
        if self.pair_retry_attempts == 0 {
            return Err("PAIR_RETRY_ATTEMPTS must be at least 1".into());
        }
        if self.heartbeat_interval_secs == 0 || self.heartbeat_timeout_secs == 0 {
            return Err("HEARTBEAT_INTERVAL_SECS and HEARTBEAT_TIMEOUT_SECS must be positive".into());
        }
        if self.http_timeout_secs == 0 {
            return Err("HTTP_TIMEOUT_SECS cannot be 0 (every provider call would time out)".into());
        }
        if self.queue_delay_ms == 0 {
            tracing::warn!("⚠️  QUEUE_DELAY_MS is 0. RPC rate limits may reject back-to-back lookups.");
        }
        if self.moralis_api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
            tracing::warn!("⚠️  MORALIS_API_KEY not set. Moralis fallbacks are disabled.");
        }
        Ok(())
    }

    pub fn destination_for(&self, target_key: &str) -> Option<&str> {
        self.destinations.get(target_key).map(String::as_str)
    }

    pub fn queue_delay(&self) -> Duration {
        Duration::from_millis(self.queue_delay_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_secs(self.heartbeat_timeout_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn pair_retry(&self) -> RetryPolicy {
        RetryPolicy::fixed(self.pair_retry_attempts, Duration::from_secs(self.pair_retry_delay_secs))
    }
}


#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
