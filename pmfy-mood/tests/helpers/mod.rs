//! Stub collaborators for integration tests
//!
//! Every stub counts its calls and can be scripted to fail.

#![allow(dead_code)]

use async_trait::async_trait;
use pmfy_mood::clients::{Classifier, CoverArtLookup, FeatureProvider, IdentityResolver, TrackSearch};
use pmfy_mood::models::{CandidateTrack, FeatureColumn, FeatureMatrix, FeatureSet, Track};
use pmfy_mood::pipeline::OrchestratorOptions;
use pmfy_mood::recommend::RecommendationOptions;
use pmfy_mood::resolver::RetryPolicy;
use pmfy_mood::{ClassifierError, FetchError};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Complete feature set whose valence carries the label the stub classifier returns
pub fn features_for_label(label: i64) -> FeatureSet {
    FeatureColumn::ALL
        .into_iter()
        .map(|c| {
            let value = match c {
                FeatureColumn::Valence => label as f64,
                FeatureColumn::Tempo => 120.0,
                _ => 0.5,
            };
            (c, value)
        })
        .collect()
}

pub fn track(position: usize, title: &str, artist: &str) -> Track {
    Track::new(position, title, artist)
}

pub fn fast_options(concurrency: usize, max_retries: u32) -> OrchestratorOptions {
    OrchestratorOptions {
        concurrency,
        retry: RetryPolicy::immediate(max_retries),
        cache_capacity: 64,
    }
}

pub fn fast_recommendation_options() -> RecommendationOptions {
    RecommendationOptions {
        task_timeout: Duration::from_secs(10),
        keyword_limit: 5,
        shuffle_keywords: false,
        retry: RetryPolicy::immediate(1),
    }
}

/// Tracks the peak number of concurrent calls
#[derive(Default)]
pub struct InFlight {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl InFlight {
    pub fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    pub fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct StubIdentity {
    pub calls: AtomicUsize,
    ids: HashMap<String, String>,
    transient_failures: Mutex<HashMap<String, VecDeque<FetchError>>>,
    outage: Option<FetchError>,
    delay: Option<Duration>,
    pub in_flight: InFlight,
}

impl StubIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `title` to `id`
    pub fn with_track(mut self, title: &str, id: &str) -> Self {
        self.ids.insert(title.to_string(), id.to_string());
        self
    }

    /// Fail `times` transiently for `title` before succeeding
    pub fn failing_first(self, title: &str, times: usize) -> Self {
        let failures = (0..times)
            .map(|i| FetchError::Transient(format!("scripted failure {}", i)))
            .collect();
        self.transient_failures
            .lock()
            .unwrap()
            .insert(title.to_string(), failures);
        self
    }

    pub fn with_outage(mut self, error: FetchError) -> Self {
        self.outage = Some(error);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityResolver for StubIdentity {
    async fn resolve(&self, title: &str, _artist: &str) -> Result<String, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.in_flight.enter();
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.exit();

        if let Some(error) = &self.outage {
            return Err(error.clone());
        }
        let scripted = self
            .transient_failures
            .lock()
            .unwrap()
            .get_mut(title)
            .and_then(VecDeque::pop_front);
        if let Some(error) = scripted {
            return Err(error);
        }
        self.ids.get(title).cloned().ok_or(FetchError::NotFound)
    }
}

// ---------------------------------------------------------------------------
// Features
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct StubFeatures {
    pub calls: AtomicUsize,
    features: HashMap<String, FeatureSet>,
    outage: Option<FetchError>,
}

impl StubFeatures {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_features(mut self, id: &str, features: FeatureSet) -> Self {
        self.features.insert(id.to_string(), features);
        self
    }

    pub fn with_outage(mut self, error: FetchError) -> Self {
        self.outage = Some(error);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeatureProvider for StubFeatures {
    async fn fetch_by_id(&self, id: &str) -> Result<FeatureSet, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = &self.outage {
            return Err(error.clone());
        }
        self.features.get(id).cloned().ok_or(FetchError::NotFound)
    }
}

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

/// Returns each row's valence as its label
#[derive(Default)]
pub struct StubClassifier {
    pub calls: AtomicUsize,
    pub matrices: Mutex<Vec<FeatureMatrix>>,
    override_labels: Option<Vec<i64>>,
    failure: Option<ClassifierError>,
}

impl StubClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn returning(mut self, labels: Vec<i64>) -> Self {
        self.override_labels = Some(labels);
        self
    }

    pub fn failing(mut self, error: ClassifierError) -> Self {
        self.failure = Some(error);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Classifier for StubClassifier {
    async fn predict(&self, matrix: &FeatureMatrix) -> Result<Vec<i64>, ClassifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.matrices.lock().unwrap().push(matrix.clone());

        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        if let Some(labels) = &self.override_labels {
            return Ok(labels.clone());
        }
        let valence = matrix
            .columns
            .iter()
            .position(|c| *c == "valence")
            .expect("valence column");
        Ok(matrix.rows.iter().map(|row| row[valence] as i64).collect())
    }
}

// ---------------------------------------------------------------------------
// Track search
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct StubSearch {
    pub similar_calls: AtomicUsize,
    pub keyword_calls: AtomicUsize,
    similar: HashMap<String, CandidateTrack>,
    keywords: HashMap<String, Vec<CandidateTrack>>,
    every_similar: Option<CandidateTrack>,
    every_keyword: Option<Vec<CandidateTrack>>,
    outage: Option<FetchError>,
    delay: Option<Duration>,
    similar_delay: Option<Duration>,
}

impl StubSearch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Similar-track answer for a seed title
    pub fn with_similar(mut self, seed_title: &str, candidate: CandidateTrack) -> Self {
        self.similar.insert(seed_title.to_string(), candidate);
        self
    }

    pub fn with_keyword(mut self, keyword: &str, candidates: Vec<CandidateTrack>) -> Self {
        self.keywords.insert(keyword.to_string(), candidates);
        self
    }

    /// Same similar-track answer for every seed
    pub fn with_every_similar(mut self, candidate: CandidateTrack) -> Self {
        self.every_similar = Some(candidate);
        self
    }

    /// Same keyword answer for every keyword
    pub fn with_every_keyword(mut self, candidates: Vec<CandidateTrack>) -> Self {
        self.every_keyword = Some(candidates);
        self
    }

    pub fn with_outage(mut self, error: FetchError) -> Self {
        self.outage = Some(error);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Delay applied to similar-track calls only
    pub fn with_similar_delay(mut self, delay: Duration) -> Self {
        self.similar_delay = Some(delay);
        self
    }

    async fn pause(&self) -> Result<(), FetchError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.outage {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl TrackSearch for StubSearch {
    async fn similar(&self, title: &str, _artist: &str) -> Result<Option<CandidateTrack>, FetchError> {
        self.similar_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.similar_delay {
            tokio::time::sleep(delay).await;
        }
        self.pause().await?;
        Ok(self
            .similar
            .get(title)
            .cloned()
            .or_else(|| self.every_similar.clone()))
    }

    async fn by_keyword(&self, keyword: &str, limit: usize) -> Result<Vec<CandidateTrack>, FetchError> {
        self.keyword_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await?;
        let mut candidates = self
            .keywords
            .get(keyword)
            .cloned()
            .or_else(|| self.every_keyword.clone())
            .unwrap_or_default();
        candidates.truncate(limit);
        Ok(candidates)
    }
}

// ---------------------------------------------------------------------------
// Cover art
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct StubCovers {
    pub calls: AtomicUsize,
}

#[async_trait]
impl CoverArtLookup for StubCovers {
    async fn cover_url(&self, title: &str, _artist: &str) -> Option<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Some(format!("https://covers.test/{}.jpg", title.to_lowercase().replace(' ', "-")))
    }
}
