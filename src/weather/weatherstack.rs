use super::types::*;
use crate::config::Config;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde_json::Value;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum UpstreamError {
    #[error("weatherstack request timed out after {0:?}")]
    Timeout(Duration),
    #[error("weatherstack error {code}: {message}")]
    Provider { code: i64, message: String },
    #[error("unexpected response from weatherstack: {0}")]
    InvalidResponse(String),
    #[error("weatherstack network error: {0}")]
    Network(String),
}

pub struct WeatherstackClient {
    client: Client,
    api_key: String,
    base_url: String,
    timeout: Duration,
}

impl WeatherstackClient {
    pub fn new(config: &Config) -> reqwest::Result<Self> {
        Self::with_settings(&config.api_key, &config.base_url, config.timeout())
    }

    pub fn with_settings(api_key: &str, base_url: &str, timeout: Duration) -> reqwest::Result<Self> {
        let client = Client::builder()
            .user_agent("WeatherCacheServer/1.0")
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    /// Fetches current conditions for `city` with a single bounded attempt.
    pub async fn fetch_weather(&self, city: &str) -> Result<WeatherResult, UpstreamError> {
        let started = Instant::now();
        let result = self.get_current(city).await;

        tracing::info!(
            city,
            duration_ms = started.elapsed().as_secs_f64() * 1000.0,
            ok = result.is_ok(),
            "weatherstack request"
        );

        normalize(result?, city, Utc::now())
    }

    async fn get_current(&self, city: &str) -> Result<CurrentResponse, UpstreamError> {
        let url = format!("{}/current", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("access_key", self.api_key.as_str()), ("query", city)])
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            // Some failures still carry the provider's error envelope
            let envelope = serde_json::from_slice::<CurrentResponse>(&body)
                .ok()
                .and_then(|payload| payload.error);
            return Err(provider_error(envelope.as_ref(), status.as_u16().into()));
        }

        let payload: CurrentResponse = serde_json::from_slice(&body)
            .map_err(|e| UpstreamError::InvalidResponse(e.to_string()))?;

        // Weatherstack reports most errors with HTTP 200 and `success: false`
        if payload.success == Some(false) || payload.error.is_some() {
            return Err(provider_error(payload.error.as_ref(), status.as_u16().into()));
        }

        Ok(payload)
    }

    fn transport_error(&self, err: reqwest::Error) -> UpstreamError {
        if err.is_timeout() {
            UpstreamError::Timeout(self.timeout)
        } else {
            UpstreamError::Network(err.to_string())
        }
    }
}

fn provider_error(body: Option<&ProviderErrorBody>, fallback_code: i64) -> UpstreamError {
    let code = body.and_then(|b| b.code).unwrap_or(fallback_code);
    let kind = body.and_then(|b| b.kind.as_deref()).unwrap_or_default();
    let info = body.and_then(|b| b.info.as_deref()).unwrap_or_default();

    tracing::warn!(code, kind, info, "weatherstack error");

    let message = match (kind.is_empty(), info.is_empty()) {
        (false, false) => format!("{}: {}", kind, info),
        (false, true) => kind.to_string(),
        (true, false) => info.to_string(),
        (true, true) => format!("HTTP status {}", fallback_code),
    };

    UpstreamError::Provider { code, message }
}

/// Reduces a provider payload to the stable result shape.
fn normalize(
    payload: CurrentResponse,
    requested_city: &str,
    fetched_at: DateTime<Utc>,
) -> Result<WeatherResult, UpstreamError> {
    let location = payload
        .location
        .ok_or_else(|| UpstreamError::InvalidResponse("missing location".to_string()))?;
    let current = payload
        .current
        .ok_or_else(|| UpstreamError::InvalidResponse("missing current conditions".to_string()))?;

    let temperature_celsius = current
        .temperature
        .as_ref()
        .and_then(as_number)
        .ok_or_else(|| UpstreamError::InvalidResponse("missing or non-numeric temperature".to_string()))?;

    let city = location
        .name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| requested_city.to_string());

    let description = current
        .weather_descriptions
        .and_then(|descriptions| descriptions.into_iter().next())
        .unwrap_or_default();

    let observed_at = location
        .localtime_epoch
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .unwrap_or(fetched_at);

    Ok(WeatherResult {
        city,
        temperature_celsius,
        description,
        observed_at,
    })
}

fn as_number(value: &Value) -> Option<f64> {
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse::<f64>().ok()))
        .filter(|n| n.is_finite())
}
