//! Page flow for the home view: units preference, city lookup, forecast,
//! and the visitor's search history.

use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::{
    database::{DatabaseError, SearchHistory},
    forecast::{
        openmeteo::WeatherError,
        types::{Forecast, Location, Units},
    },
    routes::AppState,
    session::{SessionError, SessionStore},
};

/// Number of history rows shown on the page.
pub const HISTORY_LIMIT: i64 = 5;

#[derive(Error, Debug)]
pub enum HomeError {
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("Failed to serialize forecast: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// What the visitor sent: a submitted form, or a plain page load.
#[derive(Debug, Clone)]
pub enum HomeRequest {
    Submit {
        city: Option<String>,
        units: Option<String>,
    },
    Load {
        city: Option<String>,
    },
}

/// Reasons a lookup produced no forecast, each with the message shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchFailure {
    LocationUnavailable,
    LocationUnreadable,
    CityNotFound,
    ForecastUnavailable,
}

impl SearchFailure {
    fn from_geocoding(error: &WeatherError) -> Self {
        match error {
            WeatherError::Network(_) | WeatherError::Upstream { .. } => Self::LocationUnavailable,
            WeatherError::Parse(_) => Self::LocationUnreadable,
            WeatherError::NotFound => Self::CityNotFound,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::LocationUnavailable => {
                "Произошла ошибка при получении данных о местоположении. Пожалуйста, попробуйте позже."
            }
            Self::LocationUnreadable => {
                "Произошла ошибка при обработке данных о местоположении. Пожалуйста, попробуйте позже."
            }
            Self::CityNotFound => {
                "Город не найден. Пожалуйста, проверьте название и попробуйте снова."
            }
            Self::ForecastUnavailable => {
                "Не удалось получить данные о погоде. Пожалуйста, попробуйте позже."
            }
        }
    }
}

/// Everything the page needs to render.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HomeContext {
    pub weather_data: Option<Forecast>,
    /// `weather_data` serialized for client-side scripts.
    pub weather_data_json: Option<String>,
    pub last_search: Option<SearchHistory>,
    pub search_history: Vec<SearchHistory>,
    pub error_message: Option<String>,
    pub units: Units,
}

/// Geocoding term: the part of the input before the first comma.
pub fn query_term(city: &str) -> &str {
    city.split(',').next().unwrap_or_default().trim()
}

/// First candidate in `preferred_country`, else the first candidate overall.
pub fn select_location<'a>(
    candidates: &'a [Location],
    preferred_country: &str,
) -> Result<&'a Location, WeatherError> {
    candidates
        .iter()
        .find(|location| location.country.as_deref() == Some(preferred_country))
        .or_else(|| candidates.first())
        .ok_or(WeatherError::NotFound)
}

pub async fn home(
    state: &AppState,
    session: &dyn SessionStore,
    request: HomeRequest,
) -> Result<HomeContext, HomeError> {
    let session_key = session.session_key().await?;
    let saved_units = session.units().await?.unwrap_or_default();

    let (city, units) = match request {
        HomeRequest::Submit { city, units } => {
            let units = units
                .and_then(|raw| raw.parse::<Units>().ok())
                .unwrap_or(saved_units);
            session.set_units(units).await?;
            (city, units)
        }
        HomeRequest::Load { city } => (city, saved_units),
    };
    let city = city.filter(|c| !c.trim().is_empty());

    let mut weather_data = None;
    let mut error_message = None;

    if let Some(city) = city {
        tracing::info!(%city, "Searching for city");

        match lookup(state, &city, units).await {
            Ok((full_city_name, forecast)) => {
                tracing::info!("Weather data successfully retrieved");
                state
                    .database
                    .upsert_search(&session_key, &full_city_name, units)
                    .await?;
                weather_data = Some(forecast);
            }
            Err(failure) => {
                error_message = Some(failure.message().to_string());
            }
        }
    }

    let search_history = state
        .database
        .recent_searches(&session_key, HISTORY_LIMIT)
        .await?;
    let last_search = search_history.first().cloned();
    let weather_data_json = weather_data
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    Ok(HomeContext {
        weather_data,
        weather_data_json,
        last_search,
        search_history,
        error_message,
        units,
    })
}

/// Resolves the city to a location and fetches its forecast.
async fn lookup(
    state: &AppState,
    city: &str,
    units: Units,
) -> Result<(String, Forecast), SearchFailure> {
    let candidates = state
        .weather_client
        .geocode(query_term(city))
        .await
        .map_err(|e| SearchFailure::from_geocoding(&e))?;

    let location = select_location(&candidates, &state.config.preferred_country).map_err(|e| {
        tracing::warn!(%city, "City not found");
        SearchFailure::from_geocoding(&e)
    })?;

    let full_city_name = location.display_name();
    tracing::info!(
        city = %full_city_name,
        latitude = location.latitude,
        longitude = location.longitude,
        "Fetching weather"
    );

    let forecast = state
        .weather_client
        .get_weather(location.latitude, location.longitude, units)
        .await
        .map_err(|_| {
            tracing::error!(city = %full_city_name, "Failed to retrieve weather data");
            SearchFailure::ForecastUnavailable
        })?;

    Ok((full_city_name, forecast))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::openmeteo::tests::forecast_body;
    use crate::routes::tests::test_state;
    use crate::session::tests::MemorySession;
    use serde_json::{json, Value};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn candidate(name: &str, lat: f64, lon: f64, admin1: Option<&str>, country: &str) -> Location {
        Location {
            name: name.to_string(),
            latitude: lat,
            longitude: lon,
            admin1: admin1.map(str::to_string),
            country: Some(country.to_string()),
        }
    }

    async fn mount_geocoding(server: &MockServer, body: Value) {
        Mock::given(method("GET"))
            .and(path("/v1/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    fn submit(city: &str, units: Option<&str>) -> HomeRequest {
        HomeRequest::Submit {
            city: Some(city.to_string()),
            units: units.map(str::to_string),
        }
    }

    #[test]
    fn test_query_term_takes_text_before_first_comma() {
        assert_eq!(query_term("  Казань , Татарстан, Россия"), "Казань");
        assert_eq!(query_term("Omsk"), "Omsk");
        assert_eq!(query_term(""), "");
    }

    #[test]
    fn test_select_location_prefers_russia() {
        let candidates = vec![
            candidate("Moscow", 46.73, -117.0, Some("Idaho"), "United States"),
            candidate("Moscow", 55.75, 37.62, Some("Moscow"), "Russia"),
        ];
        let selected = select_location(&candidates, "Russia").unwrap();
        assert_eq!(selected.latitude, 55.75);
    }

    #[test]
    fn test_select_location_falls_back_to_first() {
        let candidates = vec![
            candidate("Paris", 48.85, 2.35, None, "France"),
            candidate("Paris", 33.66, -95.55, Some("Texas"), "United States"),
        ];
        let selected = select_location(&candidates, "Russia").unwrap();
        assert_eq!(selected.country.as_deref(), Some("France"));
    }

    #[test]
    fn test_select_location_empty_is_not_found() {
        assert!(matches!(select_location(&[], "Russia"), Err(WeatherError::NotFound)));
    }

    #[tokio::test]
    async fn test_search_uses_russian_candidate_and_records_history() {
        let server = MockServer::start().await;
        mount_geocoding(
            &server,
            json!({ "results": [
                {"name": "Moscow", "latitude": 46.73, "longitude": -117.0,
                 "admin1": "Idaho", "country": "United States"},
                {"name": "Moscow", "latitude": 55.75, "longitude": 37.62,
                 "admin1": "Moscow", "country": "Russia"}
            ]}),
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .and(query_param("latitude", "55.75"))
            .and(query_param("longitude", "37.62"))
            .and(query_param("temperature_unit", "fahrenheit"))
            .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body()))
            .expect(1)
            .mount(&server)
            .await;

        let state = test_state(&server.uri()).await;
        let session = MemorySession::new("visitor");

        let context = home(&state, &session, submit("Moscow, Idaho", Some("F")))
            .await
            .unwrap();

        assert!(context.error_message.is_none());
        assert_eq!(context.units, Units::F);
        let forecast = context.weather_data.as_ref().unwrap();
        assert_eq!(forecast.days.len(), 7);
        assert_eq!(forecast.units, Units::F);
        let mirrored: Value = serde_json::from_str(context.weather_data_json.as_deref().unwrap()).unwrap();
        assert_eq!(mirrored["units"], "F");

        let last = context.last_search.unwrap();
        assert_eq!(last.city, "Moscow, Moscow, Russia");
        assert_eq!(last.units, Units::F);
        assert_eq!(context.search_history.len(), 1);
        assert_eq!(session.units().await.unwrap(), Some(Units::F));
    }

    #[tokio::test]
    async fn test_search_without_russian_candidate_uses_first() {
        let server = MockServer::start().await;
        mount_geocoding(
            &server,
            json!({ "results": [
                {"name": "Paris", "latitude": 48.85, "longitude": 2.35, "country": "France"},
                {"name": "Paris", "latitude": 33.66, "longitude": -95.55,
                 "admin1": "Texas", "country": "United States"}
            ]}),
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .and(query_param("latitude", "48.85"))
            .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body()))
            .expect(1)
            .mount(&server)
            .await;

        let state = test_state(&server.uri()).await;
        let session = MemorySession::new("visitor");

        let context = home(&state, &session, HomeRequest::Load { city: Some("Paris".to_string()) })
            .await
            .unwrap();

        assert_eq!(context.last_search.unwrap().city, "Paris, France");
        assert_eq!(context.units, Units::C);
    }

    #[tokio::test]
    async fn test_unknown_city_reports_not_found_without_forecast_call() {
        let server = MockServer::start().await;
        mount_geocoding(&server, json!({ "generationtime_ms": 0.3 })).await;
        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body()))
            .expect(0)
            .mount(&server)
            .await;

        let state = test_state(&server.uri()).await;
        let session = MemorySession::new("visitor");

        let context = home(&state, &session, submit("Nowhereville", None)).await.unwrap();

        assert_eq!(context.error_message.as_deref(), Some(SearchFailure::CityNotFound.message()));
        assert!(context.weather_data.is_none());
        assert!(context.weather_data_json.is_none());
        assert!(context.search_history.is_empty());
    }

    #[tokio::test]
    async fn test_null_geocoding_results_report_not_found() {
        let server = MockServer::start().await;
        mount_geocoding(&server, json!({ "results": null })).await;

        let state = test_state(&server.uri()).await;
        let session = MemorySession::new("visitor");

        let context = home(&state, &session, submit("Nowhereville", None)).await.unwrap();

        assert_eq!(context.error_message.as_deref(), Some(SearchFailure::CityNotFound.message()));
        assert!(context.weather_data.is_none());
    }

    #[tokio::test]
    async fn test_repeat_search_keeps_single_history_row() {
        let server = MockServer::start().await;
        mount_geocoding(
            &server,
            json!({ "results": [
                {"name": "Казань", "latitude": 55.79, "longitude": 49.12,
                 "admin1": "Татарстан", "country": "Russia"}
            ]}),
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body()))
            .mount(&server)
            .await;

        let state = test_state(&server.uri()).await;
        let session = MemorySession::new("visitor");

        let first = home(&state, &session, submit("Казань", None)).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        let second = home(&state, &session, submit("Казань", None)).await.unwrap();

        assert_eq!(second.search_history.len(), 1);
        let before = first.last_search.unwrap();
        let after = second.last_search.unwrap();
        assert_eq!(before.id, after.id);
        assert!(after.search_date > before.search_date);
    }

    #[tokio::test]
    async fn test_forecast_failure_sets_message_and_skips_history() {
        let server = MockServer::start().await;
        mount_geocoding(
            &server,
            json!({ "results": [
                {"name": "Омск", "latitude": 54.99, "longitude": 73.37, "country": "Russia"}
            ]}),
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let state = test_state(&server.uri()).await;
        let session = MemorySession::new("visitor");

        let context = home(&state, &session, submit("Омск", None)).await.unwrap();

        assert_eq!(
            context.error_message.as_deref(),
            Some(SearchFailure::ForecastUnavailable.message())
        );
        assert!(context.weather_data.is_none());
        assert!(context.search_history.is_empty());
    }

    #[tokio::test]
    async fn test_geocoding_failures_map_to_messages() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/search"))
            .and(query_param("name", "Down"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/search"))
            .and(query_param("name", "Garbled"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let state = test_state(&server.uri()).await;
        let session = MemorySession::new("visitor");

        let down = home(&state, &session, submit("Down", None)).await.unwrap();
        assert_eq!(
            down.error_message.as_deref(),
            Some(SearchFailure::LocationUnavailable.message())
        );

        let garbled = home(&state, &session, submit("Garbled", None)).await.unwrap();
        assert_eq!(
            garbled.error_message.as_deref(),
            Some(SearchFailure::LocationUnreadable.message())
        );
    }

    #[tokio::test]
    async fn test_page_load_uses_saved_units_and_shows_history() {
        let server = MockServer::start().await;
        let state = test_state(&server.uri()).await;
        let session = MemorySession::new("visitor");
        session.set_units(Units::F).await.unwrap();
        state
            .database
            .upsert_search("visitor", "Тверь, Russia", Units::C)
            .await
            .unwrap();
        state
            .database
            .upsert_search("someone-else", "Омск, Russia", Units::C)
            .await
            .unwrap();

        let context = home(&state, &session, HomeRequest::Load { city: None }).await.unwrap();

        assert_eq!(context.units, Units::F);
        assert!(context.weather_data.is_none());
        assert!(context.error_message.is_none());
        assert_eq!(context.search_history.len(), 1);
        assert_eq!(context.last_search.unwrap().city, "Тверь, Russia");
    }

    #[tokio::test]
    async fn test_unrecognized_units_keep_saved_preference() {
        let server = MockServer::start().await;
        let state = test_state(&server.uri()).await;
        let session = MemorySession::new("visitor");
        session.set_units(Units::F).await.unwrap();

        let context = home(
            &state,
            &session,
            HomeRequest::Submit { city: Some("   ".to_string()), units: Some("K".to_string()) },
        )
        .await
        .unwrap();

        assert_eq!(context.units, Units::F);
        assert_eq!(session.units().await.unwrap(), Some(Units::F));
        assert!(context.error_message.is_none());
    }
}
