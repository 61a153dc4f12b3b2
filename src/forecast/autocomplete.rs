use super::openmeteo::{fetch_json, WeatherError};
use super::types::PlaceSearchResult;
use crate::config::Config;
use reqwest::Client;

const SEARCH_PATH: &str = "/search";
const MAX_SUGGESTIONS: usize = 5;

/// City name suggestions from a Nominatim-style place search.
pub struct PlaceSearchClient {
    client: Client,
    config: Config,
}

impl PlaceSearchClient {
    pub fn new(config: Config) -> Result<Self, WeatherError> {
        // Nominatim rejects requests without an identifying User-Agent.
        let client = Client::builder()
            .user_agent(config.place_search_user_agent.as_str())
            .timeout(config.http_timeout())
            .build()?;

        Ok(Self { client, config })
    }

    /// Never fails: any upstream problem is logged and yields no suggestions.
    pub async fn suggest(&self, term: &str) -> Vec<String> {
        match self.search(term).await {
            Ok(names) => names,
            Err(e) => {
                tracing::error!(term, "Error fetching place suggestions: {}", e);
                Vec::new()
            }
        }
    }

    async fn search(&self, term: &str) -> Result<Vec<String>, WeatherError> {
        let url = format!("{}{}", self.config.place_search_base_url, SEARCH_PATH);
        let request = self
            .client
            .get(&url)
            .query(&[("format", "json"), ("q", term)]);

        let results: Vec<PlaceSearchResult> = fetch_json(request).await?;
        Ok(results
            .into_iter()
            .take(MAX_SUGGESTIONS)
            .map(|place| place.display_name)
            .collect())
    }
}
