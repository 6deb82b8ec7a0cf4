use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

/// Documented ceiling for `CHAT_TTL`; larger values are clamped.
pub const MAX_TTL_DAYS: u32 = 3;

// ── Top-level config ──────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Administrative identity: quota-exempt, may run owner commands.
    #[serde(default)]
    pub bot_owner: Option<String>,

    #[serde(default)]
    pub limits: LimitsConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub sweeper: SweeperConfig,

    #[serde(default)]
    pub generation: GenerationConfig,
}

// ── Quota / validation limits ─────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Requests admitted per 24h window, bot-wide. 0 disables the quota.
    #[serde(default = "default_daily_limit")]
    pub daily_limit: u32,
    /// Optional per-user ceiling within the same window. 0 disables.
    #[serde(default)]
    pub per_user_limit: u32,
    /// Maximum prompt length in chars; longer prompts are rejected
    /// before any quota is consumed.
    #[serde(default = "default_max_prompt_chars")]
    pub max_prompt_chars: usize,
}

fn default_daily_limit() -> u32 {
    1500
}

fn default_max_prompt_chars() -> usize {
    1000
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            daily_limit: default_daily_limit(),
            per_user_limit: 0,
            max_prompt_chars: default_max_prompt_chars(),
        }
    }
}

// ── Session store ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Days of inactivity before a session is evicted. 0 disables eviction.
    /// Clamped to [`MAX_TTL_DAYS`].
    #[serde(default = "default_ttl_days")]
    pub ttl_days: u32,
    /// Most recent turns handed to the generator as context. 0 = all.
    #[serde(default = "default_max_history_turns")]
    pub max_history_turns: usize,
}

fn default_ttl_days() -> u32 {
    MAX_TTL_DAYS
}

fn default_max_history_turns() -> usize {
    30
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_days: default_ttl_days(),
            max_history_turns: default_max_history_turns(),
        }
    }
}

impl SessionConfig {
    /// Eviction threshold, or `None` when eviction is disabled.
    pub fn ttl(&self) -> Option<chrono::Duration> {
        if self.ttl_days == 0 {
            None
        } else {
            Some(chrono::Duration::days(i64::from(self.ttl_days)))
        }
    }
}

// ── Eviction sweeper ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweeperConfig {
    /// Hours between eviction passes.
    #[serde(default = "default_sweep_interval_hours")]
    pub interval_hours: u32,
}

fn default_sweep_interval_hours() -> u32 {
    6
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval_hours: default_sweep_interval_hours(),
        }
    }
}

// ── Generation backend ────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Endpoint the HTTP generator posts to.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Opaque credential passed through as a bearer token; never parsed.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// Seconds the gateway waits for a generation before surfacing a
    /// timeout. The in-flight call is dropped, not cancelled upstream.
    #[serde(default = "default_generation_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_generation_timeout_secs() -> u64 {
    30
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            timeout_secs: default_generation_timeout_secs(),
        }
    }
}

// ── Environment loading ───────────────────────────────────────────

impl Config {
    /// Build a config from the process environment, falling back to
    /// defaults for anything unset.
    ///
    /// Recognized variables: `BOT_OWNER`, `DAILY_LIMIT`, `PER_USER_LIMIT`,
    /// `MAX_PROMPT_CHARS`, `CHAT_TTL` (days), `MAX_HISTORY_TURNS`,
    /// `SWEEP_INTERVAL_HOURS`, `GENERATION_ENDPOINT`, `GENERATION_API_KEY`,
    /// `GENERATION_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self {
            bot_owner: env_string("BOT_OWNER"),
            ..Self::default()
        };

        if let Some(limit) = env_parse("DAILY_LIMIT")? {
            config.limits.daily_limit = limit;
        }
        if let Some(limit) = env_parse("PER_USER_LIMIT")? {
            config.limits.per_user_limit = limit;
        }
        if let Some(max) = env_parse("MAX_PROMPT_CHARS")? {
            config.limits.max_prompt_chars = max;
        }
        if let Some(ttl) = env_parse("CHAT_TTL")? {
            config.session.ttl_days = ttl;
        }
        if let Some(turns) = env_parse("MAX_HISTORY_TURNS")? {
            config.session.max_history_turns = turns;
        }
        if let Some(hours) = env_parse("SWEEP_INTERVAL_HOURS")? {
            config.sweeper.interval_hours = hours;
        }
        config.generation.endpoint = env_string("GENERATION_ENDPOINT");
        config.generation.api_key = env_string("GENERATION_API_KEY");
        if let Some(secs) = env_parse("GENERATION_TIMEOUT_SECS")? {
            config.generation.timeout_secs = secs;
        }

        config.normalize();
        config.validate()?;
        Ok(config)
    }

    /// Clamp out-of-range values that have a documented ceiling.
    pub fn normalize(&mut self) {
        if self.session.ttl_days > MAX_TTL_DAYS {
            tracing::warn!(
                requested = self.session.ttl_days,
                max = MAX_TTL_DAYS,
                "CHAT_TTL exceeds the documented maximum, clamping"
            );
            self.session.ttl_days = MAX_TTL_DAYS;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.max_prompt_chars == 0 {
            return Err(ConfigError::Validation(
                "MAX_PROMPT_CHARS must be at least 1".into(),
            ));
        }
        if self.generation.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "GENERATION_TIMEOUT_SECS must be at least 1".into(),
            ));
        }
        if self.sweeper.interval_hours == 0 {
            return Err(ConfigError::Validation(
                "SWEEP_INTERVAL_HOURS must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

fn env_string(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.is_empty())
}

fn env_parse<T: FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    match env_string(key) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::Load(format!("{key}: cannot parse {raw:?}"))),
    }
}
