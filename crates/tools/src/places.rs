//! Practitioner discovery via the Google Places API.
//!
//! Two-step lookup: a text search for the query (e.g. "cardiologists in
//! Berlin"), then a details request per hit for the phone number and
//! website. The result list is capped so a broad query does not flood the
//! model context.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com/maps/api/place";
const DEFAULT_RESULT_CAP: usize = 5;

/// One discovered practitioner or practice.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Practitioner {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

/// Google Places client.
#[derive(Clone)]
pub struct PlacesClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    result_cap: usize,
}

#[derive(Deserialize)]
struct TextSearchResponse {
    status: String,
    #[serde(default)]
    results: Vec<TextSearchHit>,
    error_message: Option<String>,
}

#[derive(Deserialize)]
struct TextSearchHit {
    place_id: String,
    name: String,
    formatted_address: Option<String>,
}

#[derive(Deserialize)]
struct DetailsResponse {
    status: String,
    result: Option<PlaceDetails>,
}

#[derive(Deserialize, Default)]
struct PlaceDetails {
    name: Option<String>,
    formatted_phone_number: Option<String>,
    website: Option<String>,
}

impl PlacesClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            result_cap: DEFAULT_RESULT_CAP,
        }
    }

    /// Cap on returned practitioners (default 5, minimum 1).
    pub fn with_result_cap(mut self, cap: usize) -> Self {
        self.result_cap = cap.max(1);
        self
    }

    /// Override the API base URL (used by tests against a local server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Find practitioners matching a query, optionally scoped to a location.
    pub async fn search(&self, query: &str, location: &str) -> Result<Vec<Practitioner>> {
        let search_query = if location.is_empty() {
            query.to_string()
        } else {
            format!("{query} in {location}")
        };
        debug!(query = %search_query, "places text search");

        let response: TextSearchResponse = self
            .http
            .get(format!("{}/textsearch/json", self.base_url))
            .query(&[
                ("query", search_query.as_str()),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?
            .json()
            .await?;

        match response.status.as_str() {
            "OK" => {}
            "ZERO_RESULTS" => return Ok(Vec::new()),
            status => {
                let detail = response.error_message.unwrap_or_default();
                return Err(Error::Api(format!("places search {status}: {detail}")));
            }
        }

        let mut practitioners = Vec::new();
        for hit in response.results.into_iter().take(self.result_cap) {
            let details = self.details(&hit.place_id).await?;
            practitioners.push(Practitioner {
                name: details.name.unwrap_or(hit.name),
                address: hit.formatted_address,
                phone: details.formatted_phone_number,
                website: details.website,
            });
        }
        Ok(practitioners)
    }

    async fn details(&self, place_id: &str) -> Result<PlaceDetails> {
        let response: DetailsResponse = self
            .http
            .get(format!("{}/details/json", self.base_url))
            .query(&[
                ("place_id", place_id),
                ("fields", "name,formatted_phone_number,website"),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?
            .json()
            .await?;

        if response.status != "OK" {
            return Err(Error::Api(format!(
                "places details {} for {place_id}",
                response.status
            )));
        }
        Ok(response.result.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_cap_has_a_floor_of_one() {
        let client = PlacesClient::new("key").with_result_cap(0);
        assert_eq!(client.result_cap, 1);
    }

    #[test]
    fn text_search_response_parses_api_shape() {
        let raw = r#"{
            "status": "OK",
            "results": [
                {"place_id": "abc", "name": "Herzzentrum Berlin",
                 "formatted_address": "Augustenburger Platz 1, Berlin"}
            ]
        }"#;
        let parsed: TextSearchResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.status, "OK");
        assert_eq!(parsed.results.len(), 1);
        assert_eq!(parsed.results[0].place_id, "abc");
    }

    #[test]
    fn details_response_tolerates_missing_fields() {
        let raw = r#"{"status": "OK", "result": {"name": "Praxis Weber"}}"#;
        let parsed: DetailsResponse = serde_json::from_str(raw).unwrap();
        let details = parsed.result.unwrap();
        assert_eq!(details.name.as_deref(), Some("Praxis Weber"));
        assert!(details.formatted_phone_number.is_none());
        assert!(details.website.is_none());
    }
}
