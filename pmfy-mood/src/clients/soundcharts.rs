//! SoundCharts API client
//!
//! Song search for identity resolution, song metadata for audio features.

use super::{build_http_client, direct_limiter, status_error, DirectLimiter, FeatureProvider, IdentityResolver};
use crate::error::FetchError;
use crate::models::{FeatureColumn, FeatureSet};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://customer.api.soundcharts.com";
const REQUESTS_PER_SECOND: u32 = 10;
const SEARCH_LIMIT: usize = 20;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    uuid: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SongResponse {
    object: Option<SongObject>,
}

#[derive(Debug, Deserialize)]
struct SongObject {
    audio: Option<HashMap<String, Value>>,
}

pub struct SoundChartsClient {
    http_client: reqwest::Client,
    rate_limiter: DirectLimiter,
    base_url: String,
    app_id: String,
    api_key: String,
}

impl SoundChartsClient {
    pub fn new(
        base_url: impl Into<String>,
        app_id: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http_client: build_http_client(timeout)?,
            rate_limiter: direct_limiter(REQUESTS_PER_SECOND),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            app_id: app_id.into(),
            api_key: api_key.into(),
        })
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, FetchError> {
        self.rate_limiter.until_ready().await;

        let response = self
            .http_client
            .get(url)
            .header("x-app-id", &self.app_id)
            .header("x-api-key", &self.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }
        Ok(response)
    }
}

#[async_trait]
impl IdentityResolver for SoundChartsClient {
    async fn resolve(&self, title: &str, artist: &str) -> Result<String, FetchError> {
        let url = search_url(&self.base_url, title, artist);
        tracing::debug!(title, artist, "Searching SoundCharts");

        let body: SearchResponse = self.get(&url).await?.json().await?;
        first_uuid(body)
    }
}

#[async_trait]
impl FeatureProvider for SoundChartsClient {
    async fn fetch_by_id(&self, id: &str) -> Result<FeatureSet, FetchError> {
        let url = format!("{}/api/v2.25/song/{}", self.base_url, urlencoding::encode(id));
        tracing::debug!(uuid = id, "Fetching SoundCharts audio features");

        let body: SongResponse = self.get(&url).await?.json().await?;
        audio_features(body)
    }
}

fn search_url(base_url: &str, title: &str, artist: &str) -> String {
    let query = if artist.trim().is_empty() {
        title.trim().to_string()
    } else {
        format!("{} {}", title.trim(), artist.trim())
    };
    format!(
        "{}/api/v2/song/search/{}?offset=0&limit={}",
        base_url,
        urlencoding::encode(&query),
        SEARCH_LIMIT
    )
}

fn first_uuid(body: SearchResponse) -> Result<String, FetchError> {
    body.items
        .into_iter()
        .find_map(|item| item.uuid.filter(|uuid| !uuid.is_empty()))
        .ok_or(FetchError::NotFound)
}

/// Extract the eight feature columns from `object.audio`
///
/// A song without an audio block is a miss. A block lacking any column is
/// rejected since the track could never be classified.
fn audio_features(body: SongResponse) -> Result<FeatureSet, FetchError> {
    let audio = body
        .object
        .and_then(|object| object.audio)
        .ok_or(FetchError::NotFound)?;

    let features: FeatureSet = FeatureColumn::ALL
        .iter()
        .filter_map(|column| {
            audio
                .get(column.name())
                .and_then(Value::as_f64)
                .map(|value| (*column, value))
        })
        .collect();

    let missing = features.missing();
    if !missing.is_empty() {
        let names: Vec<&str> = missing.iter().map(|c| c.name()).collect();
        return Err(FetchError::Rejected(format!(
            "audio block missing {}",
            names.join(", ")
        )));
    }
    Ok(features)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_search_url_encodes_query() {
        let url = search_url(DEFAULT_BASE_URL, "Blinding Lights", "The Weeknd");
        assert_eq!(
            url,
            "https://customer.api.soundcharts.com/api/v2/song/search/Blinding%20Lights%20The%20Weeknd?offset=0&limit=20"
        );
    }

    #[test]
    fn test_first_uuid_skips_blank() {
        let body: SearchResponse = serde_json::from_value(json!({
            "items": [{"uuid": ""}, {"uuid": "abc-123"}]
        }))
        .unwrap();
        assert_eq!(first_uuid(body).unwrap(), "abc-123");
    }

    #[test]
    fn test_empty_search_is_not_found() {
        let body: SearchResponse = serde_json::from_value(json!({"items": []})).unwrap();
        assert_eq!(first_uuid(body), Err(FetchError::NotFound));

        let body: SearchResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(first_uuid(body), Err(FetchError::NotFound));
    }

    #[test]
    fn test_audio_features_parsed() {
        let body: SongResponse = serde_json::from_value(json!({
            "object": {
                "audio": {
                    "acousticness": 0.001, "danceability": 0.514, "energy": 0.73,
                    "instrumentalness": 0.0, "liveness": 0.0897, "speechiness": 0.0598,
                    "tempo": 171, "valence": 0.334, "key": 1
                }
            }
        }))
        .unwrap();

        let features = audio_features(body).unwrap();
        assert!(features.is_complete());
        assert_eq!(features.get(FeatureColumn::Tempo), Some(171.0));
        assert_eq!(features.get(FeatureColumn::Danceability), Some(0.514));
    }

    #[test]
    fn test_missing_audio_block_is_not_found() {
        let body: SongResponse = serde_json::from_value(json!({"object": {}})).unwrap();
        assert_eq!(audio_features(body), Err(FetchError::NotFound));
    }

    #[test]
    fn test_partial_audio_is_rejected() {
        let body: SongResponse = serde_json::from_value(json!({
            "object": {"audio": {"energy": 0.5, "tempo": null}}
        }))
        .unwrap();
        assert!(matches!(audio_features(body), Err(FetchError::Rejected(_))));
    }
}
