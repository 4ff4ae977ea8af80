pub mod cache;
pub mod types;
pub mod weatherstack;

use crate::config::Config;
use crate::error::AppError;
use cache::TtlCache;
use std::time::Duration;
use types::WeatherResult;
use weatherstack::WeatherstackClient;

pub const MAX_CITY_LEN: usize = 100;

/// A validated city name in two forms: the display form sent upstream and
/// the lower-cased form used as the cache key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CityName {
    pub display: String,
    pub key: String,
}

impl CityName {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let display = collapse_whitespace(raw);

        if display.is_empty() {
            return Err(AppError::Validation("city must not be empty".to_string()));
        }
        if display.chars().count() > MAX_CITY_LEN {
            return Err(AppError::Validation(format!(
                "city must be at most {} characters",
                MAX_CITY_LEN
            )));
        }

        let key = display.to_lowercase();
        Ok(Self { display, key })
    }

    pub fn cache_key(raw: &str) -> String {
        collapse_whitespace(raw).to_lowercase()
    }
}

fn collapse_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
    Bypass,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
            CacheStatus::Bypass => "BYPASS",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Lookup {
    pub result: WeatherResult,
    pub cache: CacheStatus,
}

/// Serves current weather through the cache, fetching on a miss.
pub struct WeatherService {
    client: WeatherstackClient,
    cache: TtlCache,
    ttl: Duration,
}

impl WeatherService {
    pub fn new(client: WeatherstackClient, cache: TtlCache, ttl: Duration) -> Self {
        Self { client, cache, ttl }
    }

    pub fn from_config(config: &Config) -> reqwest::Result<Self> {
        let client = WeatherstackClient::new(config)?;
        let cache = if config.cache_enabled {
            TtlCache::new(config.cache_max_entries)
        } else {
            TtlCache::disabled()
        };

        Ok(Self::new(client, cache, config.cache_ttl()))
    }

    pub fn cache(&self) -> &TtlCache {
        &self.cache
    }

    pub async fn current_weather(&self, raw_city: &str) -> Result<Lookup, AppError> {
        let city = CityName::parse(raw_city)?;

        if let Some(result) = self.cache.get(&city.key).await {
            tracing::info!(city = %city.display, "cache hit");
            return Ok(Lookup {
                result,
                cache: CacheStatus::Hit,
            });
        }

        let status = if self.cache.is_enabled() {
            tracing::info!(city = %city.display, "cache miss");
            CacheStatus::Miss
        } else {
            CacheStatus::Bypass
        };

        // Failures propagate before anything is stored
        let result = self.client.fetch_weather(&city.display).await?;
        self.cache.put(&city.key, result.clone(), self.ttl).await;

        Ok(Lookup {
            result,
            cache: status,
        })
    }
}
