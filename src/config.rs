//! Configuration for the bot token, quota policy and endpoints
//!
//! Loads configuration from config.yml file; environment variables
//! (optionally from a `.env` file) take precedence.

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::pairing::quota::{DEFAULT_DAILY_BONUS, DEFAULT_INITIAL_QUOTA, DEFAULT_REFERRAL_BONUS};
use crate::pairing::{ParticipantId, QuotaPolicy};

pub const CONFIG_FILE: &str = "config.yml";
pub const BOT_TOKEN_ENV: &str = "BOT_TOKEN";
pub const ADMIN_IDS_ENV: &str = "ADMIN_IDS";
pub const METRICS_ADDR_ENV: &str = "METRICS_ADDR";

/// YAML config structures
#[derive(Debug, Deserialize)]
struct YamlConfig {
    telegram: Option<TelegramConfig>,
    quota: Option<QuotaConfig>,
    admins: Option<Vec<i64>>,
    metrics: Option<MetricsConfig>,
}

#[derive(Debug, Default, Deserialize)]
struct TelegramConfig {
    bot_token: Option<String>,
    bot_username: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct QuotaConfig {
    initial: Option<u32>,
    daily_bonus: Option<u32>,
    referral_bonus: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct MetricsConfig {
    addr: Option<String>,
}

/// Main configuration struct
#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    /// Used to build referral links; `None` disables them.
    pub bot_username: Option<String>,
    pub initial_quota: u32,
    pub daily_bonus: u32,
    pub referral_bonus: u32,
    /// Exempt identities: never charged, never refused for quota.
    pub admin_ids: Vec<ParticipantId>,
    pub metrics_addr: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Load configuration from config.yml or use defaults
    pub fn new() -> Self {
        Self::load_from_file(CONFIG_FILE)
            .or_else(|_| Self::load_from_file(format!("../{CONFIG_FILE}")))
            .unwrap_or_else(|_| Self::defaults().with_env_overrides())
    }

    /// Resolve a value: prefer env var if config value looks like ${VAR}
    fn resolve_env_string(value: Option<String>, env_key: &str) -> Option<String> {
        if let Some(ref v) = value {
            if let Some(var_name) = v.strip_prefix("${").and_then(|v| v.strip_suffix('}')) {
                if let Ok(env_val) = std::env::var(var_name) {
                    return Some(env_val);
                }
            }
        }
        if let Ok(env_val) = std::env::var(env_key) {
            if !env_val.is_empty() {
                return Some(env_val);
            }
        }
        value.filter(|v| !v.starts_with("${"))
    }

    /// Parse a comma-separated list of ids, skipping garbage.
    pub fn parse_admin_ids(raw: &str) -> Vec<ParticipantId> {
        raw.split(',')
            .filter_map(|s| s.trim().parse::<i64>().ok())
            .map(ParticipantId)
            .collect()
    }

    fn load_dotenv() {
        if dotenvy::dotenv().is_err() {
            let _ = dotenvy::from_filename("../.env");
        }
    }

    /// Load configuration from a specific file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_dotenv();

        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::ConfigError(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let yaml: YamlConfig = serde_yaml::from_str(&content)
            .map_err(|e| Error::ConfigError(format!("Failed to parse config file: {}", e)))?;

        let telegram = yaml.telegram.unwrap_or_default();
        let quota = yaml.quota.unwrap_or_default();
        let metrics = yaml.metrics.unwrap_or_default();

        let config = Self {
            bot_token: telegram.bot_token.unwrap_or_default(),
            bot_username: telegram
                .bot_username
                .map(|name| name.trim_start_matches('@').to_string()),
            initial_quota: quota.initial.unwrap_or(DEFAULT_INITIAL_QUOTA),
            daily_bonus: quota.daily_bonus.unwrap_or(DEFAULT_DAILY_BONUS),
            referral_bonus: quota.referral_bonus.unwrap_or(DEFAULT_REFERRAL_BONUS),
            admin_ids: yaml
                .admins
                .unwrap_or_default()
                .into_iter()
                .map(ParticipantId)
                .collect(),
            metrics_addr: metrics.addr,
        };

        Ok(config.with_env_overrides())
    }

    fn with_env_overrides(mut self) -> Self {
        self.bot_token =
            Self::resolve_env_string(Some(self.bot_token), BOT_TOKEN_ENV).unwrap_or_default();
        self.metrics_addr = Self::resolve_env_string(self.metrics_addr, METRICS_ADDR_ENV);
        if let Ok(raw) = std::env::var(ADMIN_IDS_ENV) {
            for id in Self::parse_admin_ids(&raw) {
                if !self.admin_ids.contains(&id) {
                    self.admin_ids.push(id);
                }
            }
        }
        self
    }

    /// Built-in defaults; the bot token must still come from the environment.
    fn defaults() -> Self {
        Self {
            bot_token: String::new(),
            bot_username: None,
            initial_quota: DEFAULT_INITIAL_QUOTA,
            daily_bonus: DEFAULT_DAILY_BONUS,
            referral_bonus: DEFAULT_REFERRAL_BONUS,
            admin_ids: Vec::new(),
            metrics_addr: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.bot_token.trim().is_empty() {
            return Err(Error::ConfigError(format!(
                "bot token is missing: set telegram.bot_token or {BOT_TOKEN_ENV}"
            )));
        }
        Ok(())
    }

    pub fn quota_policy(&self) -> QuotaPolicy {
        QuotaPolicy::new(self.initial_quota, self.daily_bonus, self.referral_bonus)
            .with_exempt(self.admin_ids.iter().copied())
    }

    /// Token safe to print: only the bot id prefix survives.
    pub fn masked_token(&self) -> String {
        match self.bot_token.split_once(':') {
            Some((bot_id, _)) => format!("{bot_id}:***"),
            None if self.bot_token.is_empty() => "<unset>".to_string(),
            None => "***".to_string(),
        }
    }

    pub fn referral_link(&self, referrer: ParticipantId) -> Option<String> {
        self.bot_username
            .as_ref()
            .map(|name| format!("https://t.me/{name}?start=ref_{referrer}"))
    }
}
