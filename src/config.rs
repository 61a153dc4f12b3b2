use std::env;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct Config {
    pub geocoding_base_url: String,
    pub forecast_base_url: String,
    pub place_search_base_url: String,
    pub place_search_user_agent: String,
    pub geocoding_language: String,
    pub preferred_country: String,
    pub http_timeout_secs: u64,
    pub forecast_cache_ttl_secs: u64,
    pub session_inactivity_secs: u64,
    pub database_url: String,
    pub bind_addr: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Config {
            geocoding_base_url: env::var("GEOCODING_BASE_URL")
                .unwrap_or_else(|_| "https://geocoding-api.open-meteo.com".to_string()),
            forecast_base_url: env::var("FORECAST_BASE_URL")
                .unwrap_or_else(|_| "https://api.open-meteo.com".to_string()),
            place_search_base_url: env::var("PLACE_SEARCH_BASE_URL")
                .unwrap_or_else(|_| "https://nominatim.openstreetmap.org".to_string()),
            place_search_user_agent: env::var("PLACE_SEARCH_USER_AGENT").unwrap_or_else(|_| {
                "WeatherApp/1.0 (https://yourwebsite.com; yourname@example.com)".to_string()
            }),
            geocoding_language: env::var("GEOCODING_LANGUAGE").unwrap_or_else(|_| "ru".to_string()),
            preferred_country: env::var("PREFERRED_COUNTRY")
                .unwrap_or_else(|_| "Russia".to_string()),
            http_timeout_secs: parse_var("HTTP_TIMEOUT_SECS", 5)?,
            forecast_cache_ttl_secs: parse_var("FORECAST_CACHE_TTL_SECS", 30 * 60)?,
            session_inactivity_secs: parse_var("SESSION_INACTIVITY_SECS", 14 * 24 * 60 * 60)?,
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:./weather.db?mode=rwc".to_string()),
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
        })
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn forecast_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.forecast_cache_ttl_secs)
    }

    pub fn session_inactivity(&self) -> tower_sessions::cookie::time::Duration {
        tower_sessions::cookie::time::Duration::seconds(
            i64::try_from(self.session_inactivity_secs).unwrap_or(i64::MAX),
        )
    }
}

fn parse_var(key: &str, default: u64) -> anyhow::Result<u64> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{} must be a whole number of seconds: {}", key, e)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
impl Config {
    /// Points every upstream at the same mock server.
    pub fn for_mock_server(base_url: &str) -> Self {
        Config {
            geocoding_base_url: base_url.to_string(),
            forecast_base_url: base_url.to_string(),
            place_search_base_url: base_url.to_string(),
            place_search_user_agent: "WeatherAppTest/1.0".to_string(),
            geocoding_language: "ru".to_string(),
            preferred_country: "Russia".to_string(),
            http_timeout_secs: 5,
            forecast_cache_ttl_secs: 30 * 60,
            session_inactivity_secs: 60 * 60,
            database_url: "sqlite::memory:".to_string(),
            bind_addr: "127.0.0.1:0".to_string(),
        }
    }
}
