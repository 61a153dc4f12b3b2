use super::types::*;
use super::{cache_key, init_cache, ForecastCache};
use crate::config::Config;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use thiserror::Error;

const GEOCODING_SEARCH_PATH: &str = "/v1/search";
const FORECAST_PATH: &str = "/v1/forecast";
const CANDIDATE_COUNT: &str = "5";
const FORECAST_DAYS: &str = "7";
const DAILY_FIELDS: &str = "temperature_2m_max,temperature_2m_min,precipitation_sum,weathercode";

#[derive(Error, Debug)]
pub enum WeatherError {
    #[error("HTTP request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("JSON parsing failed: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("No matching location")]
    NotFound,
    #[error("Upstream returned HTTP {status}: {body}")]
    Upstream { status: u16, body: String },
}

/// Sends the request and decodes a JSON body. Non-2xx statuses become
/// `Upstream`, transport failures (timeouts included) `Network`, and
/// undecodable bodies `Parse`.
pub(crate) async fn fetch_json<T: DeserializeOwned>(
    request: RequestBuilder,
) -> Result<T, WeatherError> {
    let response = request.send().await?;
    let status = response.status();

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(WeatherError::Upstream {
            status: status.as_u16(),
            body,
        });
    }

    let body = response.text().await?;
    Ok(serde_json::from_str(&body)?)
}

/// Geocoding and daily forecast lookups against the Open-Meteo APIs.
pub struct OpenMeteoClient {
    client: Client,
    config: Config,
    cache: ForecastCache,
}

impl OpenMeteoClient {
    pub fn new(config: Config) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .user_agent("WeatherLookup/1.0")
            .timeout(config.http_timeout())
            .build()?;
        let cache = init_cache(config.forecast_cache_ttl());

        Ok(Self {
            client,
            config,
            cache,
        })
    }

    /// Candidate locations for a free-text name, in upstream order.
    pub async fn geocode(&self, term: &str) -> Result<Vec<Location>, WeatherError> {
        let url = format!("{}{}", self.config.geocoding_base_url, GEOCODING_SEARCH_PATH);
        let request = self.client.get(&url).query(&[
            ("name", term),
            ("count", CANDIDATE_COUNT),
            ("language", self.config.geocoding_language.as_str()),
            ("format", "json"),
        ]);

        match fetch_json::<GeocodingResponse>(request).await {
            Ok(response) => {
                tracing::info!(term, candidates = response.results.len(), "Geocoding response received");
                Ok(response.results)
            }
            Err(e) => {
                tracing::error!(term, "Error fetching geocoding data: {}", e);
                Err(e)
            }
        }
    }

    /// Seven-day daily forecast, served from the cache while fresh.
    pub async fn get_weather(
        &self,
        latitude: f64,
        longitude: f64,
        units: Units,
    ) -> Result<Forecast, WeatherError> {
        tracing::info!(latitude, longitude, %units, "Getting weather for coordinates");

        let key = cache_key(latitude, longitude, units);
        if let Some(cached) = self.cache.get(&key).await {
            tracing::debug!(%key, "Forecast cache hit");
            return Ok(cached);
        }

        let url = format!("{}{}", self.config.forecast_base_url, FORECAST_PATH);
        let latitude_param = latitude.to_string();
        let longitude_param = longitude.to_string();
        let request = self.client.get(&url).query(&[
            ("latitude", latitude_param.as_str()),
            ("longitude", longitude_param.as_str()),
            ("daily", DAILY_FIELDS),
            ("temperature_unit", units.temperature_unit()),
            ("timezone", "auto"),
            ("forecast_days", FORECAST_DAYS),
        ]);

        let response = fetch_json::<ForecastResponse>(request).await.map_err(|e| {
            tracing::error!(latitude, longitude, "Error fetching weather data: {}", e);
            e
        })?;

        let forecast = Forecast::from_response(response, units);
        self.cache.insert(key, forecast.clone()).await;

        Ok(forecast)
    }
}
