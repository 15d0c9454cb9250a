//! Last.fm API client
//!
//! `track.getSimilar` and `track.search`. Last.fm collapses one-element lists
//! into a bare object and reports artists either as a string or as an object,
//! so both shapes are accepted.

use super::{build_http_client, direct_limiter, DirectLimiter, TrackSearch};
use crate::error::FetchError;
use crate::models::CandidateTrack;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://ws.audioscrobbler.com/2.0/";
// Last.fm asks clients to stay under 5 requests per second
const REQUESTS_PER_SECOND: u32 = 5;
const SIMILAR_LIMIT: usize = 5;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ArtistField {
    Name(String),
    Object { name: String },
}

impl ArtistField {
    fn into_name(self) -> String {
        match self {
            ArtistField::Name(name) | ArtistField::Object { name } => name,
        }
    }
}

#[derive(Debug, Deserialize)]
struct LastFmImage {
    #[serde(rename = "#text", default)]
    url: String,
    #[serde(default)]
    size: String,
}

#[derive(Debug, Deserialize)]
struct LastFmTrack {
    name: Option<String>,
    artist: Option<ArtistField>,
    #[serde(default)]
    image: Option<Vec<LastFmImage>>,
}

#[derive(Debug, Deserialize)]
struct SimilarResponse {
    similartracks: Option<TrackList>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: Option<SearchResults>,
}

#[derive(Debug, Deserialize)]
struct SearchResults {
    trackmatches: Option<TrackList>,
}

#[derive(Debug, Deserialize)]
struct TrackList {
    track: Option<OneOrMany<LastFmTrack>>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: u32,
    #[serde(default)]
    message: String,
}

pub struct LastFmClient {
    http_client: reqwest::Client,
    rate_limiter: DirectLimiter,
    base_url: String,
    api_key: String,
}

impl LastFmClient {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        Self::with_base_url(DEFAULT_BASE_URL, api_key, timeout)
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http_client: build_http_client(timeout)?,
            rate_limiter: direct_limiter(REQUESTS_PER_SECOND),
            base_url: base_url.into(),
            api_key: api_key.into(),
        })
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: &[(&str, &str)]) -> Result<T, FetchError> {
        self.rate_limiter.until_ready().await;

        let mut query: Vec<(&str, &str)> = vec![
            ("method", method),
            ("api_key", self.api_key.as_str()),
            ("format", "json"),
        ];
        query.extend_from_slice(params);

        let response = self.http_client.get(&self.base_url).query(&query).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        parse_body(status, &body)
    }
}

#[async_trait]
impl TrackSearch for LastFmClient {
    async fn similar(&self, title: &str, artist: &str) -> Result<Option<CandidateTrack>, FetchError> {
        tracing::debug!(title, artist, "Querying Last.fm similar tracks");
        let limit = SIMILAR_LIMIT.to_string();
        let response: SimilarResponse = match self
            .call(
                "track.getSimilar",
                &[("track", title), ("artist", artist), ("limit", limit.as_str())],
            )
            .await
        {
            Err(FetchError::NotFound) => return Ok(None),
            other => other?,
        };

        Ok(similar_candidates(response).into_iter().next())
    }

    async fn by_keyword(&self, keyword: &str, limit: usize) -> Result<Vec<CandidateTrack>, FetchError> {
        tracing::debug!(keyword, limit, "Querying Last.fm track search");
        let limit = limit.to_string();
        let response: SearchResponse = match self
            .call("track.search", &[("track", keyword), ("limit", limit.as_str())])
            .await
        {
            Err(FetchError::NotFound) => return Ok(Vec::new()),
            other => other?,
        };

        Ok(search_candidates(response))
    }
}

/// Decode a response body, honouring Last.fm's in-band error object
fn parse_body<T: DeserializeOwned>(status: u16, body: &str) -> Result<T, FetchError> {
    if let Ok(error) = serde_json::from_str::<ErrorBody>(body) {
        return Err(error_for_code(error.error, &error.message));
    }
    if !(200..300).contains(&status) {
        return Err(FetchError::from_status(status, body.trim()));
    }
    serde_json::from_str(body).map_err(|e| FetchError::Rejected(format!("unparseable Last.fm response: {}", e)))
}

fn error_for_code(code: u32, message: &str) -> FetchError {
    let detail = format!("Last.fm error {}: {}", code, message);
    match code {
        // Authentication failed, invalid key, suspended key
        4 | 10 | 26 => FetchError::Unreachable(detail),
        // Operation failed, service offline, temporary error, rate limit
        8 | 11 | 16 | 29 => FetchError::Transient(detail),
        // Invalid parameters (unknown track), invalid resource
        6 | 7 => FetchError::NotFound,
        _ => FetchError::Rejected(detail),
    }
}

fn similar_candidates(response: SimilarResponse) -> Vec<CandidateTrack> {
    to_candidates(response.similartracks)
}

fn search_candidates(response: SearchResponse) -> Vec<CandidateTrack> {
    to_candidates(response.results.and_then(|r| r.trackmatches))
}

fn to_candidates(list: Option<TrackList>) -> Vec<CandidateTrack> {
    list.and_then(|l| l.track)
        .map(OneOrMany::into_vec)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|track| {
            let title = track.name.filter(|n| !n.trim().is_empty())?;
            let artist = track.artist.map(ArtistField::into_name).unwrap_or_default();
            Some(CandidateTrack {
                title,
                artist,
                image_url: track.image.as_deref().and_then(largest_image),
            })
        })
        .collect()
}

/// Largest non-empty `extralarge` or `large` image
fn largest_image(images: &[LastFmImage]) -> Option<String> {
    images
        .iter()
        .rev()
        .filter(|img| img.size == "extralarge" || img.size == "large")
        .find(|img| !img.url.is_empty())
        .map(|img| img.url.clone())
}
