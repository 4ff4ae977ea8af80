use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Normalized current conditions returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherResult {
    pub city: String,
    pub temperature_celsius: f64,
    pub description: String,
    pub observed_at: DateTime<Utc>,
}

// Weatherstack `/current` payload, reduced to the fields that get consumed.
// Everything is optional so a shape mismatch surfaces as an invalid response
// instead of a JSON error.

#[derive(Debug, Clone, Deserialize)]
pub struct CurrentResponse {
    pub success: Option<bool>,
    pub error: Option<ProviderErrorBody>,
    pub location: Option<CurrentLocation>,
    pub current: Option<CurrentConditions>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderErrorBody {
    pub code: Option<i64>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub info: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CurrentLocation {
    pub name: Option<String>,
    pub localtime_epoch: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CurrentConditions {
    pub temperature: Option<Value>,
    pub weather_descriptions: Option<Vec<String>>,
}
