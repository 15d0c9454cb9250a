//! Final analysis report

use crate::models::{FeatureSet, MoodLabel, PipelineRun, Stage, StageStats, Track};
use crate::pipeline::MoodDistribution;
use crate::recommend::RecommendationMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One classified track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRecord {
    pub position: usize,
    pub title: String,
    pub artist: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<FeatureSet>,
    pub mood: Option<MoodLabel>,
}

impl From<&Track> for TrackRecord {
    fn from(track: &Track) -> Self {
        Self {
            position: track.position,
            title: track.title.clone(),
            artist: track.artist.clone(),
            external_id: track.external_id.clone(),
            features: track.features.clone(),
            mood: track.mood,
        }
    }
}

/// Loss diagnostics for one stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageReport {
    pub stage: Stage,
    #[serde(flatten)]
    pub stats: StageStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoodReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    /// Tracks supplied to the run
    pub input_count: usize,
    pub tracks: Vec<TrackRecord>,
    pub distribution: MoodDistribution,
    pub recommendations: RecommendationMap,
    pub stages: Vec<StageReport>,
    /// Tracks silently excluded across all stages
    pub dropped: usize,
}

impl MoodReport {
    pub fn assemble(run: &PipelineRun, recommendations: RecommendationMap) -> Self {
        Self {
            run_id: run.run_id,
            generated_at: Utc::now(),
            input_count: run.input_count,
            tracks: run.tracks.iter().map(TrackRecord::from).collect(),
            distribution: MoodDistribution::from_tracks(&run.tracks),
            recommendations,
            stages: run
                .stages
                .iter()
                .map(|(stage, stats)| StageReport {
                    stage: *stage,
                    stats: *stats,
                })
                .collect(),
            dropped: run.total_dropped(),
        }
    }

    /// Whether any stage dropped tracks
    pub fn is_partial(&self) -> bool {
        self.dropped > 0
    }
}
