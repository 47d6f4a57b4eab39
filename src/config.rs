//! Runtime configuration from the environment

use crate::classifier::DEFAULT_KEYWORDS;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_API_URL: &str = "https://api.telegram.org";
const DEFAULT_LINK_ENDPOINT: &str = "http://localhost:3000/link";
const DEFAULT_TOKEN_TTL_SECS: u32 = 300;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_POINTS_PER_HELPFUL: u64 = 1;
const DEFAULT_POLL_TIMEOUT_SECS: u64 = 30;
/// Longest long-poll Telegram honours
const MAX_POLL_TIMEOUT_SECS: u64 = 50;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("Invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Bot API credential
    pub bot_token: String,
    pub telegram_api_url: String,
    /// Base URL of the linking website; tokens are appended as `?token=`
    pub link_endpoint: String,
    pub token_ttl: chrono::Duration,
    pub sweep_interval: Duration,
    /// Bearer secret the linking website presents to the callback API
    pub callback_secret: Option<String>,
    pub port: u16,
    pub webapp_url: Option<String>,
    pub points_per_helpful: u64,
    pub helpful_keywords: Vec<String>,
    pub poll_timeout: Duration,
    /// Requested via env; only honoured in debug builds
    pub debug_commands: bool,
}

impl BotConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bot_token = get("TELEGRAM_BOT_TOKEN").ok_or(ConfigError::Missing("TELEGRAM_BOT_TOKEN"))?;

        let token_ttl_secs: u32 = parse_or(&get, "LINK_TOKEN_TTL_SECS", DEFAULT_TOKEN_TTL_SECS)?;
        if token_ttl_secs == 0 {
            return Err(invalid("LINK_TOKEN_TTL_SECS", "0", "must be at least 1"));
        }

        let sweep_secs: u64 =
            parse_or(&get, "LINK_SWEEP_INTERVAL_SECS", DEFAULT_SWEEP_INTERVAL_SECS)?;
        if sweep_secs == 0 {
            return Err(invalid("LINK_SWEEP_INTERVAL_SECS", "0", "must be at least 1"));
        }

        let poll_timeout_secs: u64 =
            parse_or(&get, "POLL_TIMEOUT_SECS", DEFAULT_POLL_TIMEOUT_SECS)?;
        if poll_timeout_secs > MAX_POLL_TIMEOUT_SECS {
            return Err(invalid(
                "POLL_TIMEOUT_SECS",
                &poll_timeout_secs.to_string(),
                format!("must be at most {MAX_POLL_TIMEOUT_SECS}"),
            ));
        }

        let helpful_keywords = get("HELPFUL_KEYWORDS").map_or_else(
            || DEFAULT_KEYWORDS.iter().map(ToString::to_string).collect(),
            |raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .map(String::from)
                    .collect()
            },
        );

        Ok(Self {
            bot_token,
            telegram_api_url: get("TELEGRAM_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            link_endpoint: get("LINK_ENDPOINT").unwrap_or_else(|| DEFAULT_LINK_ENDPOINT.to_string()),
            token_ttl: chrono::Duration::seconds(i64::from(token_ttl_secs)),
            sweep_interval: Duration::from_secs(sweep_secs),
            callback_secret: get("LINK_CALLBACK_SECRET"),
            port: parse_or(&get, "KUDOS_PORT", DEFAULT_PORT)?,
            webapp_url: get("WEBAPP_URL"),
            points_per_helpful: parse_or(&get, "POINTS_PER_HELPFUL", DEFAULT_POINTS_PER_HELPFUL)?,
            helpful_keywords,
            poll_timeout: Duration::from_secs(poll_timeout_secs),
            debug_commands: parse_bool_or(&get, "KUDOS_DEBUG_COMMANDS", false)?,
        })
    }

    /// Debug commands are reachable only when requested *and* this is a
    /// debug build.
    pub fn debug_commands_enabled(&self) -> bool {
        self.debug_commands && cfg!(debug_assertions)
    }
}

fn invalid(key: &'static str, value: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: reason.into(),
    }
}

fn parse_or<T>(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| invalid(key, &raw, e.to_string())),
        None => Ok(default),
    }
}

fn parse_bool_or(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: bool,
) -> Result<bool, ConfigError> {
    let Some(raw) = get(key) else {
        return Ok(default);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(key, &raw, "expected true or false")),
    }
}
