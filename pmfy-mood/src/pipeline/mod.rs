//! Pipeline orchestrator
//!
//! Drives a [`PipelineRun`] through identity resolution, feature retrieval
//! and classification. Each stage works only on the survivors of the one
//! before it; items dropped earlier are never revisited. A stage abort stops
//! the run and no later stage executes.
//!
//! Staged tracks that already carry complete features need no identity: the
//! id is only used to fetch features.

pub mod statistics;

pub use statistics::MoodDistribution;

use crate::classifier::MoodClassifier;
use crate::clients::{Classifier, FeatureProvider, IdentityResolver};
use crate::error::{FetchError, PipelineError};
use crate::models::{FeatureSet, LookupKey, PipelineRun, PipelineState, Stage, StageStats, Track};
use crate::resolver::{BatchAbort, BatchResolver, RetryPolicy};
use pmfy_common::config::PipelineSettings;
use std::sync::Arc;

/// Concurrency, retry and cache sizing shared by the resolver stages
#[derive(Debug, Clone, Copy)]
pub struct OrchestratorOptions {
    pub concurrency: usize,
    pub retry: RetryPolicy,
    pub cache_capacity: usize,
}

impl OrchestratorOptions {
    pub fn from_settings(settings: &PipelineSettings) -> Self {
        Self {
            concurrency: settings.concurrency,
            retry: RetryPolicy::from_settings(settings),
            cache_capacity: settings.cache_capacity,
        }
    }
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self::from_settings(&PipelineSettings::default())
    }
}

pub struct PipelineOrchestrator {
    identity: Arc<dyn IdentityResolver>,
    features: Arc<dyn FeatureProvider>,
    classifier: MoodClassifier,
    identity_resolver: BatchResolver<LookupKey, String>,
    feature_resolver: BatchResolver<LookupKey, FeatureSet>,
}

impl PipelineOrchestrator {
    pub fn new(
        identity: Arc<dyn IdentityResolver>,
        features: Arc<dyn FeatureProvider>,
        classifier: Arc<dyn Classifier>,
        options: OrchestratorOptions,
    ) -> Self {
        Self {
            identity,
            features,
            classifier: MoodClassifier::new(classifier),
            identity_resolver: BatchResolver::new(
                Stage::IdentityResolution.name(),
                options.concurrency,
                options.retry,
                options.cache_capacity,
            ),
            feature_resolver: BatchResolver::new(
                Stage::FeatureRetrieval.name(),
                options.concurrency,
                options.retry,
                options.cache_capacity,
            ),
        }
    }

    pub fn identity_resolver(&self) -> &BatchResolver<LookupKey, String> {
        &self.identity_resolver
    }

    pub fn feature_resolver(&self) -> &BatchResolver<LookupKey, FeatureSet> {
        &self.feature_resolver
    }

    /// Run all stages over `tracks`
    ///
    /// On success the returned run is `Completed` and its tracks are the
    /// labelled survivors in playlist order. On failure only the error is
    /// returned.
    pub async fn run(&self, mut tracks: Vec<Track>) -> Result<PipelineRun, PipelineError> {
        tracks.sort_by_key(|t| t.position);
        let mut run = PipelineRun::new(tracks);

        tracing::info!(
            run_id = %run.run_id,
            tracks = run.input_count,
            "Starting mood pipeline"
        );

        match self.execute(&mut run).await {
            Ok(()) => {
                run.transition_to(PipelineState::Completed);
                tracing::info!(
                    run_id = %run.run_id,
                    classified = run.tracks.len(),
                    dropped = run.total_dropped(),
                    "Mood pipeline completed"
                );
                Ok(run)
            }
            Err(e) => {
                run.transition_to(PipelineState::Failed);
                tracing::error!(
                    run_id = %run.run_id,
                    stage = %e.stage(),
                    error = %e,
                    "Mood pipeline failed"
                );
                Err(e)
            }
        }
    }

    async fn execute(&self, run: &mut PipelineRun) -> Result<(), PipelineError> {
        run.transition_to(PipelineState::ResolvingIdentity);
        self.resolve_identities(run).await?;

        run.transition_to(PipelineState::FetchingFeatures);
        self.fetch_features(run).await?;

        run.transition_to(PipelineState::Classifying);
        self.classify(run).await
    }

    async fn resolve_identities(&self, run: &mut PipelineRun) -> Result<(), PipelineError> {
        let stage = Stage::IdentityResolution;
        let (mut survivors, pending): (Vec<Track>, Vec<Track>) = std::mem::take(&mut run.tracks)
            .into_iter()
            .partition(|t| t.external_id.is_some() || t.has_complete_features());
        let already_resolved = survivors.len();

        let identity = self.identity.as_ref();
        let output = self
            .identity_resolver
            .run_alongside(already_resolved, pending, Track::lookup_key, move |track: Track| async move {
                identity.resolve(&track.title, &track.artist).await
            })
            .await
            .map_err(|abort| stage_failure(stage, abort))?;

        let mut stats = output.stats;
        survivors.extend(
            output
                .into_resolved()
                .into_iter()
                .map(|(track, id)| track.with_external_id(id)),
        );

        self.finish_stage(run, stage, &mut stats, already_resolved, survivors)
    }

    async fn fetch_features(&self, run: &mut PipelineRun) -> Result<(), PipelineError> {
        let stage = Stage::FeatureRetrieval;
        let (mut survivors, pending): (Vec<Track>, Vec<Track>) = std::mem::take(&mut run.tracks)
            .into_iter()
            .partition(Track::has_complete_features);
        let already_resolved = survivors.len();

        let features = self.features.as_ref();
        let output = self
            .feature_resolver
            .run_alongside(already_resolved, pending, feature_key, move |track: Track| async move {
                match track.external_id.as_deref() {
                    Some(id) => features.fetch_by_id(id).await,
                    None => Err(FetchError::NotFound),
                }
            })
            .await
            .map_err(|abort| stage_failure(stage, abort))?;

        let mut stats = output.stats;
        survivors.extend(
            output
                .into_resolved()
                .into_iter()
                .map(|(track, set)| track.with_features(set)),
        );

        self.finish_stage(run, stage, &mut stats, already_resolved, survivors)
    }

    async fn classify(&self, run: &mut PipelineRun) -> Result<(), PipelineError> {
        let stage = Stage::Classification;
        tracing::info!(run_id = %run.run_id, stage = %stage, tracks = run.tracks.len(), "Stage starting");

        let labels = self.classifier.classify(&run.tracks).await?;
        for (track, label) in run.tracks.iter_mut().zip(labels) {
            track.mood = Some(label);
        }

        let count = run.tracks.len();
        run.record_stage(
            stage,
            StageStats {
                input: count,
                resolved: count,
                ..Default::default()
            },
        );
        tracing::info!(run_id = %run.run_id, stage = %stage, classified = count, "Stage complete");
        Ok(())
    }

    /// Reorder survivors, record stats, and stop the run if nothing is left
    fn finish_stage(
        &self,
        run: &mut PipelineRun,
        stage: Stage,
        stats: &mut StageStats,
        already_resolved: usize,
        mut survivors: Vec<Track>,
    ) -> Result<(), PipelineError> {
        stats.input += already_resolved;
        stats.resolved += already_resolved;
        stats.skipped_existing = already_resolved;

        survivors.sort_by_key(|t| t.position);
        run.tracks = survivors;
        run.record_stage(stage, *stats);

        if stats.has_losses() {
            tracing::warn!(
                run_id = %run.run_id,
                stage = %stage,
                dropped = stats.dropped(),
                remaining = run.tracks.len(),
                "Continuing with partial data"
            );
        }

        if run.tracks.is_empty() {
            return Err(PipelineError::NoTracks { stage });
        }
        Ok(())
    }
}

fn feature_key(track: &Track) -> LookupKey {
    match track.external_id.as_deref() {
        Some(id) => LookupKey::id(id),
        None => track.lookup_key(),
    }
}

fn stage_failure(stage: Stage, abort: BatchAbort) -> PipelineError {
    PipelineError::StageFailure {
        stage,
        detail: abort.detail,
    }
}
