use std::env;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://api.weatherstack.com";
pub const DEFAULT_TIMEOUT_SECONDS: f64 = 5.0;
pub const DEFAULT_CACHE_TTL_SECONDS: u64 = 300;
pub const DEFAULT_CACHE_MAX_ENTRIES: u64 = 1000;
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{0} not set")]
    Missing(&'static str),
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
}

#[derive(Clone, Debug)]
pub struct Config {
    pub api_key: String,
    pub base_url: String,
    pub timeout_seconds: f64,
    timeout: Duration,
    pub cache_enabled: bool,
    pub cache_ttl_seconds: u64,
    pub cache_max_entries: u64,
    pub bind_addr: SocketAddr,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup. Unset and
    /// blank values fall back to defaults, except for the API key.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let api_key = get("WEATHERSTACK_API_KEY").ok_or(ConfigError::Missing("WEATHERSTACK_API_KEY"))?;

        let base_url = get("WEATHERSTACK_BASE_URL")
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        if base_url.is_empty() {
            return Err(ConfigError::Invalid {
                key: "WEATHERSTACK_BASE_URL",
                value: base_url,
                reason: "must not be empty",
            });
        }

        // Out-of-range values are rejected here so `timeout()` never panics
        let (timeout_seconds, timeout) = match get("HTTP_TIMEOUT_SECONDS") {
            Some(raw) => {
                let parsed = raw
                    .parse::<f64>()
                    .ok()
                    .filter(|secs| *secs > 0.0)
                    .and_then(|secs| Duration::try_from_secs_f64(secs).ok().map(|d| (secs, d)));
                parsed.ok_or(ConfigError::Invalid {
                    key: "HTTP_TIMEOUT_SECONDS",
                    value: raw,
                    reason: "expected a positive number of seconds",
                })?
            }
            None => (DEFAULT_TIMEOUT_SECONDS, Duration::from_secs(5)),
        };

        let cache_enabled = match get("CACHE_ENABLED") {
            Some(raw) => parse_bool(&raw).ok_or(ConfigError::Invalid {
                key: "CACHE_ENABLED",
                value: raw,
                reason: "expected true or false",
            })?,
            None => true,
        };

        let cache_ttl_seconds = match get("CACHE_TTL_SECONDS") {
            Some(raw) => raw.parse::<u64>().map_err(|_| ConfigError::Invalid {
                key: "CACHE_TTL_SECONDS",
                value: raw,
                reason: "expected a whole number of seconds",
            })?,
            None => DEFAULT_CACHE_TTL_SECONDS,
        };

        let cache_max_entries = match get("CACHE_MAX_ENTRIES") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(v) if v > 0 => v,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "CACHE_MAX_ENTRIES",
                        value: raw,
                        reason: "expected a positive integer",
                    })
                }
            },
            None => DEFAULT_CACHE_MAX_ENTRIES,
        };

        let bind_raw = get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw.parse::<SocketAddr>().map_err(|_| ConfigError::Invalid {
            key: "BIND_ADDR",
            value: bind_raw.clone(),
            reason: "expected host:port",
        })?;

        Ok(Config {
            api_key,
            base_url,
            timeout_seconds,
            timeout,
            cache_enabled,
            cache_ttl_seconds,
            cache_max_entries,
            bind_addr,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
