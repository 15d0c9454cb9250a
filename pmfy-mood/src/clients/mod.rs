//! External collaborators
//!
//! Trait seams for every outbound dependency of the engine, plus the HTTP
//! implementations used in production. Tests substitute in-memory stubs.

pub mod deezer;
pub mod lastfm;
pub mod model_server;
pub mod soundcharts;

pub use deezer::DeezerClient;
pub use lastfm::LastFmClient;
pub use model_server::ModelServerClassifier;
pub use soundcharts::SoundChartsClient;

use crate::error::{ClassifierError, FetchError};
use crate::models::{CandidateTrack, FeatureMatrix, FeatureSet};
use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::time::Duration;

const USER_AGENT: &str = concat!("pmfy-mood/", env!("CARGO_PKG_VERSION"));

/// Unkeyed limiter shared by all calls of one client
pub type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Maps a track to a stable external identifier
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, title: &str, artist: &str) -> Result<String, FetchError>;
}

/// Retrieves audio features for an external identifier
#[async_trait]
pub trait FeatureProvider: Send + Sync {
    async fn fetch_by_id(&self, id: &str) -> Result<FeatureSet, FetchError>;
}

/// Opaque mood classifier
///
/// Returns one integer label per matrix row, in row order.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn predict(&self, matrix: &FeatureMatrix) -> Result<Vec<i64>, ClassifierError>;
}

/// Similarity and keyword search over a track catalogue
#[async_trait]
pub trait TrackSearch: Send + Sync {
    /// Best track similar to the seed, `None` when the source has none
    async fn similar(&self, title: &str, artist: &str) -> Result<Option<CandidateTrack>, FetchError>;

    async fn by_keyword(&self, keyword: &str, limit: usize) -> Result<Vec<CandidateTrack>, FetchError>;
}

/// Best-effort cover art lookup; failures are `None`
#[async_trait]
pub trait CoverArtLookup: Send + Sync {
    async fn cover_url(&self, title: &str, artist: &str) -> Option<String>;
}

pub(crate) fn build_http_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
}

pub(crate) fn direct_limiter(per_second: u32) -> DirectLimiter {
    let rate = NonZeroU32::new(per_second).unwrap_or(NonZeroU32::MIN);
    RateLimiter::direct(Quota::per_second(rate))
}

/// Turn a non-success response into a [`FetchError`]
pub(crate) async fn status_error(response: reqwest::Response) -> FetchError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    FetchError::from_status(status, body.trim())
}
