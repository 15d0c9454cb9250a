//! Engine facade: pipeline, recommendations and report in one call

use crate::clients::{
    DeezerClient, FeatureProvider, IdentityResolver, LastFmClient, ModelServerClassifier, SoundChartsClient,
};
use crate::config::ServiceCredentials;
use crate::error::PipelineError;
use crate::models::Track;
use crate::pipeline::{OrchestratorOptions, PipelineOrchestrator};
use crate::recommend::{RecommendationOptions, RecommendationResolver};
use crate::report::MoodReport;
use pmfy_common::config::PipelineSettings;
use pmfy_common::{Error, Result};
use std::sync::Arc;
use std::time::Duration;

pub struct MoodEngine {
    orchestrator: PipelineOrchestrator,
    recommender: RecommendationResolver,
}

impl MoodEngine {
    pub fn new(orchestrator: PipelineOrchestrator, recommender: RecommendationResolver) -> Self {
        Self {
            orchestrator,
            recommender,
        }
    }

    /// Wire the HTTP collaborators from resolved configuration
    pub fn from_settings(credentials: &ServiceCredentials, settings: &PipelineSettings) -> Result<Self> {
        settings.validate()?;
        let timeout = Duration::from_millis(settings.call_timeout_ms);
        let client_error = |e: reqwest::Error| Error::Internal(format!("Failed to build HTTP client: {}", e));

        let soundcharts = Arc::new(
            SoundChartsClient::new(
                credentials.soundcharts_base_url.as_str(),
                credentials.soundcharts_app_id.as_str(),
                credentials.soundcharts_api_key.as_str(),
                timeout,
            )
            .map_err(client_error)?,
        );
        let identity: Arc<dyn IdentityResolver> = soundcharts.clone();
        let features: Arc<dyn FeatureProvider> = soundcharts;

        let classifier = Arc::new(
            ModelServerClassifier::new(&credentials.classifier_url, timeout)
                .map_err(client_error)?
                .with_parallel_requests(settings.concurrency),
        );

        let orchestrator = PipelineOrchestrator::new(
            identity,
            features,
            classifier,
            OrchestratorOptions::from_settings(settings),
        );

        let search = Arc::new(LastFmClient::new(credentials.lastfm_api_key.as_str(), timeout).map_err(client_error)?);
        let mut recommender = RecommendationResolver::new(search, RecommendationOptions::from_settings(settings));
        if credentials.cover_art {
            recommender = recommender.with_cover_art(Arc::new(DeezerClient::new(timeout).map_err(client_error)?));
        }

        tracing::info!(
            concurrency = settings.concurrency,
            max_retries = settings.max_retries,
            cover_art = credentials.cover_art,
            "Mood engine initialized"
        );

        Ok(Self::new(orchestrator, recommender))
    }

    pub fn orchestrator(&self) -> &PipelineOrchestrator {
        &self.orchestrator
    }

    pub fn recommender(&self) -> &RecommendationResolver {
        &self.recommender
    }

    /// Classify `tracks` and resolve one recommendation per mood
    pub async fn analyze(&self, tracks: Vec<Track>) -> std::result::Result<MoodReport, PipelineError> {
        let run = self.orchestrator.run(tracks).await?;
        let recommendations = self.recommender.resolve(&run.tracks).await;
        Ok(MoodReport::assemble(&run, recommendations))
    }
}
