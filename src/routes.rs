use axum::{
    extract::{Query, State},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{error::AppError, weather::WeatherService};

pub const CACHE_STATUS_HEADER: &str = "x-cache";

// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<WeatherService>,
}

#[derive(Debug, Deserialize)]
pub struct WeatherQuery {
    pub city: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub version: String,
    pub cache_enabled: bool,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        cache_enabled: state.service.cache().is_enabled(),
    })
}

pub async fn get_weather(
    State(state): State<AppState>,
    Query(params): Query<WeatherQuery>,
) -> Result<Response, AppError> {
    let city = params.city.unwrap_or_default();
    let lookup = state.service.current_weather(&city).await?;

    Ok((
        [(CACHE_STATUS_HEADER, lookup.cache.as_str())],
        Json(lookup.result),
    )
        .into_response())
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/weather", get(get_weather))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weather::cache::TtlCache;
    use crate::weather::types::WeatherResult;
    use crate::weather::weatherstack::WeatherstackClient;
    use std::net::SocketAddr;
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn spawn_app(upstream: &MockServer, cache: TtlCache, timeout: Duration) -> SocketAddr {
        let client = WeatherstackClient::with_settings("test-key", &upstream.uri(), timeout).unwrap();
        let service = WeatherService::new(client, cache, Duration::from_secs(300));
        let app = create_router(AppState {
            service: Arc::new(service),
        });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    fn london_payload() -> serde_json::Value {
        serde_json::json!({
            "location": {"name": "London", "country": "United Kingdom", "localtime_epoch": 1714564800},
            "current": {"temperature": 15, "weather_descriptions": ["Partly cloudy"], "humidity": 72}
        })
    }

    #[tokio::test]
    async fn test_weather_end_to_end_with_cache() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/current"))
            .and(query_param("query", "London"))
            .respond_with(ResponseTemplate::new(200).set_body_json(london_payload()))
            .expect(1)
            .mount(&mock_server)
            .await;

        let addr = spawn_app(&mock_server, TtlCache::new(100), Duration::from_secs(5)).await;

        let first = reqwest::get(format!("http://{}/weather?city=London", addr))
            .await
            .unwrap();
        assert_eq!(first.status(), reqwest::StatusCode::OK);
        assert_eq!(first.headers()[CACHE_STATUS_HEADER], "MISS");
        let first_body: serde_json::Value = first.json().await.unwrap();

        assert_eq!(first_body["city"], "London");
        assert_eq!(first_body["temperatureCelsius"].as_f64(), Some(15.0));
        assert_eq!(first_body["description"], "Partly cloudy");
        assert_eq!(first_body["observedAt"], "2024-05-01T12:00:00Z");

        let second = reqwest::get(format!("http://{}/weather?city=london", addr))
            .await
            .unwrap();
        assert_eq!(second.status(), reqwest::StatusCode::OK);
        assert_eq!(second.headers()[CACHE_STATUS_HEADER], "HIT");
        let second_body: serde_json::Value = second.json().await.unwrap();

        assert_eq!(first_body, second_body);
        let parsed: WeatherResult = serde_json::from_value(second_body).unwrap();
        assert_eq!(parsed.city, "London");
    }

    #[tokio::test]
    async fn test_missing_or_blank_city_is_bad_request() {
        let mock_server = MockServer::start().await;
        let addr = spawn_app(&mock_server, TtlCache::new(100), Duration::from_secs(5)).await;

        for query in ["", "?city=", "?city=%20%20"] {
            let response = reqwest::get(format!("http://{}/weather{}", addr, query))
                .await
                .unwrap();
            assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

            let body: serde_json::Value = response.json().await.unwrap();
            assert_eq!(body["error"], "validation_error");
        }
    }

    #[tokio::test]
    async fn test_upstream_timeout_is_gateway_timeout() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/current"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(london_payload())
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&mock_server)
            .await;

        let addr = spawn_app(&mock_server, TtlCache::new(100), Duration::from_millis(200)).await;

        let response = reqwest::get(format!("http://{}/weather?city=London", addr))
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::GATEWAY_TIMEOUT);

        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["error"], "upstream_timeout");
    }

    #[tokio::test]
    async fn test_provider_error_is_bad_gateway() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/current"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": false,
                "error": {"code": 615, "type": "request_failed", "info": "Your API request failed."}
            })))
            .mount(&mock_server)
            .await;

        let addr = spawn_app(&mock_server, TtlCache::new(100), Duration::from_secs(5)).await;

        let response = reqwest::get(format!("http://{}/weather?city=Atlantis", addr))
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::BAD_GATEWAY);

        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["error"], "upstream_error");
        assert_eq!(body["message"], "weather provider request failed");
    }

    #[tokio::test]
    async fn test_health() {
        let mock_server = MockServer::start().await;
        let addr = spawn_app(&mock_server, TtlCache::disabled(), Duration::from_secs(5)).await;

        let response = reqwest::get(format!("http://{}/health", addr)).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);

        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["cache_enabled"], false);
    }
}
