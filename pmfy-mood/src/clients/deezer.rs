//! Deezer search for album cover art

use super::{build_http_client, direct_limiter, CoverArtLookup, DirectLimiter};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.deezer.com";
const REQUESTS_PER_SECOND: u32 = 10;
const SEARCH_LIMIT: &str = "10";

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(default)]
    title: String,
    #[serde(default)]
    artist: Option<HitArtist>,
    #[serde(default)]
    album: Option<HitAlbum>,
}

#[derive(Debug, Deserialize)]
struct HitArtist {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct HitAlbum {
    cover: Option<String>,
    cover_medium: Option<String>,
    cover_big: Option<String>,
}

pub struct DeezerClient {
    http_client: reqwest::Client,
    rate_limiter: DirectLimiter,
    base_url: String,
}

impl DeezerClient {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        Self::with_base_url(DEFAULT_BASE_URL, timeout)
    }

    pub fn with_base_url(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http_client: build_http_client(timeout)?,
            rate_limiter: direct_limiter(REQUESTS_PER_SECOND),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn search(&self, title: &str, artist: &str) -> Result<SearchResponse, reqwest::Error> {
        self.rate_limiter.until_ready().await;
        let query = format!("{} {}", title, artist);
        self.http_client
            .get(format!("{}/search", self.base_url))
            .query(&[("q", query.as_str()), ("limit", SEARCH_LIMIT)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }
}

#[async_trait]
impl CoverArtLookup for DeezerClient {
    async fn cover_url(&self, title: &str, artist: &str) -> Option<String> {
        match self.search(title, artist).await {
            Ok(response) => pick_cover(&response, title, artist),
            Err(e) => {
                tracing::debug!(title, artist, error = %e, "Deezer cover lookup failed");
                None
            }
        }
    }
}

/// Prefer a hit whose title and artist overlap the query, else the first hit
fn pick_cover(response: &SearchResponse, title: &str, artist: &str) -> Option<String> {
    let title = title.trim().to_lowercase();
    let artist = artist.trim().to_lowercase();

    let matching = response.data.iter().find(|hit| {
        let hit_title = hit.title.trim().to_lowercase();
        let hit_artist = hit
            .artist
            .as_ref()
            .map(|a| a.name.trim().to_lowercase())
            .unwrap_or_default();
        overlaps(&title, &hit_title) && overlaps(&artist, &hit_artist)
    });

    matching
        .or_else(|| response.data.first())
        .and_then(|hit| hit.album.as_ref())
        .and_then(album_cover)
}

fn overlaps(a: &str, b: &str) -> bool {
    a.contains(b) || b.contains(a)
}

fn album_cover(album: &HitAlbum) -> Option<String> {
    [&album.cover_big, &album.cover_medium, &album.cover]
        .into_iter()
        .flatten()
        .find(|url| !url.is_empty())
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(value: serde_json::Value) -> SearchResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_prefers_matching_hit() {
        let body = response(json!({"data": [
            {"title": "Weightless (Remix)", "artist": {"name": "Someone Else"},
             "album": {"cover_big": "wrong.jpg"}},
            {"title": "Weightless", "artist": {"name": "Marconi Union"},
             "album": {"cover_big": "big.jpg", "cover_medium": "medium.jpg"}}
        ]}));

        assert_eq!(
            pick_cover(&body, "Weightless", "Marconi Union").as_deref(),
            Some("big.jpg")
        );
    }

    #[test]
    fn test_falls_back_to_first_hit_and_smaller_cover() {
        let body = response(json!({"data": [
            {"title": "Other", "artist": {"name": "Other"}, "album": {"cover_medium": "medium.jpg"}}
        ]}));
        assert_eq!(pick_cover(&body, "Song", "Band").as_deref(), Some("medium.jpg"));
    }

    #[test]
    fn test_no_hits() {
        let body = response(json!({"data": []}));
        assert_eq!(pick_cover(&body, "Song", "Band"), None);
        assert_eq!(pick_cover(&SearchResponse::default(), "Song", "Band"), None);
    }
}
