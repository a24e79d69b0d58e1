use std::env;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::NaiveTime;
use secrecy::SecretString;

use crate::dates::default_due_time;
use crate::parser::ParseOptions;

static ENV_API_KEY: &str = "QUICKADD_API_KEY";
static ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";
static ENV_API_BASE: &str = "QUICKADD_API_BASE";
static ENV_MODEL: &str = "QUICKADD_MODEL";
static ENV_TIMEOUT_MS: &str = "QUICKADD_TIMEOUT_MS";
static ENV_SETTLE_MS: &str = "QUICKADD_SETTLE_MS";
static ENV_DEFAULT_TIME: &str = "QUICKADD_DEFAULT_TIME";
static ENV_USE_AI: &str = "QUICKADD_USE_AI";

pub static DEFAULT_API_BASE: &str = "https://api.openai.com/v1/";
pub static DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_SETTLE_WINDOW: Duration = Duration::from_millis(500);

/// Connection settings for the remote extraction service.
#[derive(Debug)]
pub struct RemoteSettings {
    /// Absent means the AI path falls back immediately.
    pub api_key: Option<SecretString>,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Debug)]
pub struct AppConfig {
    pub use_ai: bool,
    pub settle_window: Duration,
    pub default_due_time: NaiveTime,
    pub remote: RemoteSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            use_ai: true,
            settle_window: DEFAULT_SETTLE_WINDOW,
            default_due_time: default_due_time(),
            remote: RemoteSettings::default(),
        }
    }
}

impl AppConfig {
    /// Construct [`AppConfig`] from the process environment.
    pub fn discover() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Construct [`AppConfig`] from an arbitrary key lookup, falling back to
    /// defaults for absent keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut config = Self::default();

        config.remote.api_key = value(ENV_API_KEY)
            .or_else(|| value(ENV_OPENAI_API_KEY))
            .map(SecretString::from);
        if let Some(base) = value(ENV_API_BASE) {
            config.remote.base_url = base;
        }
        if let Some(model) = value(ENV_MODEL) {
            config.remote.model = model;
        }
        if let Some(raw) = value(ENV_TIMEOUT_MS) {
            config.remote.timeout = parse_millis(&raw)
                .with_context(|| format!("Invalid {ENV_TIMEOUT_MS}"))?;
        }
        if let Some(raw) = value(ENV_SETTLE_MS) {
            config.settle_window = parse_millis(&raw)
                .with_context(|| format!("Invalid {ENV_SETTLE_MS}"))?;
        }
        if let Some(raw) = value(ENV_DEFAULT_TIME) {
            config.default_due_time = parse_clock(&raw)
                .with_context(|| format!("Invalid {ENV_DEFAULT_TIME}"))?;
        }
        if let Some(raw) = value(ENV_USE_AI) {
            config.use_ai = parse_flag(&raw)
                .with_context(|| format!("Invalid {ENV_USE_AI}"))?;
        }

        Ok(config)
    }

    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            default_time: self.default_due_time,
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.remote.api_key.is_some()
    }
}

fn parse_millis(raw: &str) -> Result<Duration> {
    let millis: u64 = raw
        .parse()
        .map_err(|_| anyhow!("'{}' is not a whole number of milliseconds", raw))?;
    Ok(Duration::from_millis(millis))
}

pub fn parse_clock(raw: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map_err(|_| anyhow!("'{}' is not a HH:MM time", raw))
}

fn parse_flag(raw: &str) -> Result<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(anyhow!("'{}' is not a boolean", other)),
    }
}
