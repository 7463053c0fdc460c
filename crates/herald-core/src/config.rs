use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Top-level config (herald.toml + HERALD_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeraldConfig {
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Timing knobs for the engine tick loop, the startup store-scan retry
/// policy, and the conversation-flow TTL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Tick period of the trigger-evaluation loop, in seconds.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_secs: u64,
    /// Attempts made against the store during the startup scan before
    /// giving up and exiting.
    #[serde(default = "default_store_retries")]
    pub store_retries: u32,
    /// Fixed delay between startup scan attempts, in seconds.
    #[serde(default = "default_store_retry_delay")]
    pub store_retry_delay_secs: u64,
    /// How long an unfinished /schedule conversation survives, in seconds.
    #[serde(default = "default_flow_ttl")]
    pub flow_ttl_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: default_tick_interval(),
            store_retries: default_store_retries(),
            store_retry_delay_secs: default_store_retry_delay(),
            flow_ttl_secs: default_flow_ttl(),
        }
    }
}

impl HeraldConfig {
    /// Load config from `config_path` (or `~/.herald/herald.toml`) merged
    /// with `HERALD_*` environment overrides.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: HeraldConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("HERALD_").split("_"))
            .extract()
            .map_err(|e| crate::error::HeraldError::Config(e.to_string()))?;

        if config.telegram.bot_token.is_empty() {
            return Err(crate::error::HeraldError::Config(
                "telegram.bot_token is not set".to_string(),
            ));
        }

        Ok(config)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.herald/herald.toml", home)
}

fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.herald/herald.db", home)
}

fn default_tick_interval() -> u64 {
    1
}
fn default_store_retries() -> u32 {
    3
}
fn default_store_retry_delay() -> u64 {
    2
}
fn default_flow_ttl() -> u64 {
    600
}
