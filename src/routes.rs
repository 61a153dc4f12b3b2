use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Form, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_sessions::Session;
use utoipa::{IntoParams, OpenApi, ToSchema};

use crate::{
    config::Config,
    database::{CitySearchCount, Database, SearchHistory},
    forecast::{
        autocomplete::PlaceSearchClient,
        openmeteo::OpenMeteoClient,
        types::{DailyForecast, Forecast, Units},
    },
    service::{self, HomeContext, HomeError, HomeRequest},
};

// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub database: Arc<Database>,
    pub weather_client: Arc<OpenMeteoClient>,
    pub place_client: Arc<PlaceSearchClient>,
}

// Request/Response types
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HomeQuery {
    /// City to look up
    pub city: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SearchForm {
    pub city: Option<String>,
    pub units: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AutocompleteQuery {
    /// Partial place name
    #[serde(default)]
    pub term: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub version: String,
}

#[derive(OpenApi)]
#[openapi(
    paths(home_page, submit_search, city_autocomplete, city_search_counts, health),
    components(schemas(
        HomeContext,
        Forecast,
        DailyForecast,
        Units,
        SearchHistory,
        CitySearchCount,
        SearchForm,
        HealthResponse
    ))
)]
pub struct ApiDoc;

fn page_error(e: HomeError) -> StatusCode {
    tracing::error!("Failed to build home page: {}", e);
    StatusCode::INTERNAL_SERVER_ERROR
}

// Route handlers
#[utoipa::path(
    get,
    path = "/",
    params(HomeQuery),
    responses((status = 200, description = "Page context", body = HomeContext))
)]
pub async fn home_page(
    State(state): State<AppState>,
    session: Session,
    Query(params): Query<HomeQuery>,
) -> Result<Json<HomeContext>, StatusCode> {
    service::home(&state, &session, HomeRequest::Load { city: params.city })
        .await
        .map(Json)
        .map_err(page_error)
}

#[utoipa::path(
    post,
    path = "/",
    request_body(content = SearchForm, content_type = "application/x-www-form-urlencoded"),
    responses((status = 200, description = "Page context", body = HomeContext))
)]
pub async fn submit_search(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<SearchForm>,
) -> Result<Json<HomeContext>, StatusCode> {
    let request = HomeRequest::Submit {
        city: form.city,
        units: form.units,
    };
    service::home(&state, &session, request)
        .await
        .map(Json)
        .map_err(page_error)
}

#[utoipa::path(
    get,
    path = "/city-autocomplete",
    params(AutocompleteQuery),
    responses((status = 200, description = "Up to five place names", body = [String]))
)]
pub async fn city_autocomplete(
    State(state): State<AppState>,
    Query(params): Query<AutocompleteQuery>,
) -> Json<Vec<String>> {
    Json(state.place_client.suggest(&params.term).await)
}

#[utoipa::path(
    get,
    path = "/api/city-search-counts",
    responses((status = 200, description = "Searches per city, most searched first", body = [CitySearchCount]))
)]
pub async fn city_search_counts(
    State(state): State<AppState>,
) -> Result<Json<Vec<CitySearchCount>>, StatusCode> {
    match state.database.city_search_counts().await {
        Ok(counts) => Ok(Json(counts)),
        Err(e) => {
            tracing::error!("Failed to count city searches: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service and history store are up", body = HealthResponse),
        (status = 503, description = "History store unreachable")
    )
)]
pub async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, StatusCode> {
    if let Err(e) = state.database.health_check().await {
        tracing::error!("Health check failed: {}", e);
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}

pub async fn openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

// Create the router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home_page).post(submit_search))
        .route("/city-autocomplete", get(city_autocomplete))
        .route("/api/city-search-counts", get(city_search_counts))
        .route("/health", get(health))
        .route("/api-docs/openapi.json", get(openapi))
        .with_state(state)
}
