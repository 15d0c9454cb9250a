//! Tiered per-mood recommendation resolver
//!
//! One task per mood runs concurrently, each trying similar-track search
//! seeded from the playlist, then keyword search, then a curated fallback.
//! Tasks share a [`ClaimRegistry`] so no two moods accept the same track
//! from the similar or keyword tiers.

pub mod catalog;
pub mod claims;

pub use catalog::MoodCatalog;
pub use claims::ClaimRegistry;

use crate::clients::{CoverArtLookup, TrackSearch};
use crate::error::FetchError;
use crate::models::{CandidateTrack, MoodLabel, Recommendation, Strategy, Track};
use crate::resolver::RetryPolicy;
use futures::future::join_all;
use pmfy_common::config::PipelineSettings;
use rand::seq::SliceRandom;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

/// Exactly one recommendation per mood
pub type RecommendationMap = BTreeMap<MoodLabel, Recommendation>;

#[derive(Debug, Clone, Copy)]
pub struct RecommendationOptions {
    /// Bound on one mood task
    pub task_timeout: Duration,
    /// Candidates requested per keyword search
    pub keyword_limit: usize,
    /// Randomise keyword order per run
    pub shuffle_keywords: bool,
    pub retry: RetryPolicy,
}

impl RecommendationOptions {
    /// Tier retries are trimmed so the similar tier leaves at least half of
    /// the task timeout to the keyword tier
    pub fn from_settings(settings: &PipelineSettings) -> Self {
        let task_timeout = Duration::from_millis(settings.recommendation_timeout_ms);
        Self {
            task_timeout,
            keyword_limit: settings.keyword_limit,
            shuffle_keywords: settings.shuffle_keywords,
            retry: RetryPolicy::from_settings(settings).within(task_timeout / 2),
        }
    }
}

impl Default for RecommendationOptions {
    fn default() -> Self {
        Self::from_settings(&PipelineSettings::default())
    }
}

/// Playlist track used to seed similar-track search
#[derive(Debug, Clone)]
struct Seed {
    title: String,
    artist: String,
}

pub struct RecommendationResolver {
    search: Arc<dyn TrackSearch>,
    covers: Option<Arc<dyn CoverArtLookup>>,
    catalog: Arc<MoodCatalog>,
    options: RecommendationOptions,
}

impl RecommendationResolver {
    pub fn new(search: Arc<dyn TrackSearch>, options: RecommendationOptions) -> Self {
        Self {
            search,
            covers: None,
            catalog: Arc::new(MoodCatalog::builtin()),
            options,
        }
    }

    pub fn with_catalog(mut self, catalog: MoodCatalog) -> Self {
        self.catalog = Arc::new(catalog);
        self
    }

    pub fn with_cover_art(mut self, covers: Arc<dyn CoverArtLookup>) -> Self {
        self.covers = Some(covers);
        self
    }

    pub fn catalog(&self) -> &MoodCatalog {
        &self.catalog
    }

    /// Resolve one recommendation for each of the four moods
    ///
    /// Never fails: moods whose task errors or times out get their curated
    /// fallback.
    pub async fn resolve(&self, tracks: &[Track]) -> RecommendationMap {
        let claims = Arc::new(ClaimRegistry::new());
        let seeds = seeds_by_mood(tracks);
        let mut tasks = JoinSet::new();

        for mood in MoodLabel::ALL {
            let task = MoodTask {
                mood,
                seed: seeds.get(&mood).cloned(),
                search: Arc::clone(&self.search),
                catalog: Arc::clone(&self.catalog),
                claims: Arc::clone(&claims),
                options: self.options,
            };
            let timeout = self.options.task_timeout;
            tasks.spawn(async move {
                let outcome = tokio::time::timeout(timeout, task.run()).await;
                (mood, outcome.ok())
            });
        }

        let mut recommendations = RecommendationMap::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((mood, Some(recommendation))) => {
                    tracing::info!(
                        mood = %mood,
                        strategy = %recommendation.strategy,
                        key = %recommendation.dedup_key,
                        "Mood recommendation resolved"
                    );
                    recommendations.insert(mood, recommendation);
                }
                Ok((mood, None)) => {
                    tracing::warn!(
                        mood = %mood,
                        timeout_ms = self.options.task_timeout.as_millis() as u64,
                        "Mood task timed out"
                    );
                }
                Err(e) => {
                    tracing::error!(error = %e, "Mood task failed");
                }
            }
        }

        // Backfill outside the concurrent phase
        for mood in MoodLabel::ALL {
            if !recommendations.contains_key(&mood) {
                tracing::warn!(mood = %mood, "Backfilling mood with curated fallback");
                recommendations.insert(mood, fallback(&self.catalog, mood));
            }
        }

        if let Some(covers) = &self.covers {
            enrich_covers(covers.as_ref(), &mut recommendations).await;
        }

        recommendations
    }
}

/// First labelled track per mood, by playlist position
fn seeds_by_mood(tracks: &[Track]) -> BTreeMap<MoodLabel, Seed> {
    let mut ordered: Vec<&Track> = tracks.iter().collect();
    ordered.sort_by_key(|t| t.position);

    let mut seeds = BTreeMap::new();
    for track in ordered {
        if let Some(mood) = track.mood {
            seeds.entry(mood).or_insert_with(|| Seed {
                title: track.title.clone(),
                artist: track.artist.clone(),
            });
        }
    }
    seeds
}

fn fallback(catalog: &MoodCatalog, mood: MoodLabel) -> Recommendation {
    Recommendation::from_candidate(mood, catalog.fallback(mood).clone(), Strategy::Fallback)
}

struct MoodTask {
    mood: MoodLabel,
    seed: Option<Seed>,
    search: Arc<dyn TrackSearch>,
    catalog: Arc<MoodCatalog>,
    claims: Arc<ClaimRegistry>,
    options: RecommendationOptions,
}

impl MoodTask {
    async fn run(self) -> Recommendation {
        if let Some(candidate) = self.similar_tier().await {
            return Recommendation::from_candidate(self.mood, candidate, Strategy::Similar);
        }
        if let Some(candidate) = self.keyword_tier().await {
            return Recommendation::from_candidate(self.mood, candidate, Strategy::Keyword);
        }

        tracing::warn!(mood = %self.mood, "Search tiers exhausted, using fallback");
        let recommendation = fallback(&self.catalog, self.mood);
        // Fallbacks may collide; the claim only records the key
        self.claims.claim(&recommendation.dedup_key);
        recommendation
    }

    /// Claim the candidate's key, or reject it
    fn try_claim(&self, candidate: &CandidateTrack) -> bool {
        match candidate.dedup_key() {
            Some(key) if self.claims.claim(&key) => true,
            Some(key) => {
                tracing::debug!(mood = %self.mood, key = %key, "Candidate already claimed");
                false
            }
            None => false,
        }
    }

    async fn similar_tier(&self) -> Option<CandidateTrack> {
        let seed = self.seed.as_ref()?;
        let search = self.search.as_ref();

        let attempted = self
            .options
            .retry
            .run("similar_search", || search.similar(&seed.title, &seed.artist))
            .await;

        match attempted.result {
            Ok(Some(candidate)) if self.try_claim(&candidate) => Some(candidate),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(
                    mood = %self.mood,
                    seed = %seed.title,
                    error = %e,
                    "Similar-track search failed"
                );
                None
            }
        }
    }

    async fn keyword_tier(&self) -> Option<CandidateTrack> {
        let mut keywords = self.catalog.keywords(self.mood).to_vec();
        if self.options.shuffle_keywords {
            keywords.shuffle(&mut rand::thread_rng());
        }
        let search = self.search.as_ref();
        let limit = self.options.keyword_limit;

        for keyword in &keywords {
            let attempted = self
                .options
                .retry
                .run("keyword_search", || search.by_keyword(keyword, limit))
                .await;

            match attempted.result {
                Ok(candidates) => {
                    if let Some(candidate) = candidates.into_iter().find(|c| self.try_claim(c)) {
                        return Some(candidate);
                    }
                }
                Err(FetchError::Unreachable(detail)) => {
                    tracing::warn!(mood = %self.mood, error = %detail, "Keyword search unreachable");
                    return None;
                }
                Err(e) => {
                    tracing::debug!(mood = %self.mood, keyword = %keyword, error = %e, "Keyword search failed");
                }
            }
        }
        None
    }
}

/// Fill cover art concurrently; lookups that fail leave the entry unchanged
async fn enrich_covers(covers: &dyn CoverArtLookup, recommendations: &mut RecommendationMap) {
    let targets: Vec<(MoodLabel, String, String)> = recommendations
        .values()
        .filter(|r| r.strategy.is_unique())
        .map(|r| (r.mood, r.title.clone(), r.artist.clone()))
        .collect();

    let lookups = targets.iter().map(|(mood, title, artist)| async move {
        (*mood, covers.cover_url(title, artist).await)
    });

    for (mood, url) in join_all(lookups).await {
        if let (Some(url), Some(entry)) = (url, recommendations.get_mut(&mood)) {
            entry.image_url = Some(url);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_similar_tier_leaves_room_for_keywords() {
        let settings = PipelineSettings::default();
        let options = RecommendationOptions::from_settings(&settings);

        let worst = options.retry.worst_case().unwrap();
        assert!(worst <= options.task_timeout / 2, "worst case {:?}", worst);
        assert_eq!(
            options.retry.call_timeout,
            Some(Duration::from_millis(settings.call_timeout_ms))
        );
    }

    #[test]
    fn test_seed_is_first_by_position() {
        let mut late = Track::new(5, "Late", "A");
        late.mood = Some(MoodLabel::Sad);
        let mut early = Track::new(1, "Early", "B");
        early.mood = Some(MoodLabel::Sad);
        let mut calm = Track::new(2, "Calm One", "C");
        calm.mood = Some(MoodLabel::Calm);

        let seeds = seeds_by_mood(&[late, early, calm]);
        assert_eq!(seeds[&MoodLabel::Sad].title, "Early");
        assert_eq!(seeds[&MoodLabel::Calm].title, "Calm One");
        assert!(!seeds.contains_key(&MoodLabel::Happy));
    }
}
