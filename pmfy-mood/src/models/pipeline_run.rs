//! Pipeline run state machine
//!
//! Pending → ResolvingIdentity → FetchingFeatures → Classifying → Completed,
//! with Failed reachable from any non-terminal state.

use super::track::Track;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Pipeline stage identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    IdentityResolution,
    FeatureRetrieval,
    Classification,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Stage::IdentityResolution => "identity_resolution",
            Stage::FeatureRetrieval => "feature_retrieval",
            Stage::Classification => "classification",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Run state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineState {
    Pending,
    ResolvingIdentity,
    FetchingFeatures,
    Classifying,
    Completed,
    Failed,
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Completed | PipelineState::Failed)
    }
}

/// State transition record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub old_state: PipelineState,
    pub new_state: PipelineState,
    pub transitioned_at: DateTime<Utc>,
}

/// Per-stage diagnostics
///
/// `dropped_*` counts are the partial-data warning surface: items silently
/// excluded from the stage's output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageStats {
    /// Items entering the stage
    pub input: usize,
    /// Items leaving the stage
    pub resolved: usize,
    /// Items that already carried the stage's output
    pub skipped_existing: usize,
    pub dropped_not_found: usize,
    pub dropped_rejected: usize,
    pub dropped_retries_exhausted: usize,
    /// Lookups answered from the cache
    pub cache_hits: usize,
    /// Fetch attempts sent to the collaborator, retries included
    pub outbound_calls: usize,
}

impl StageStats {
    pub fn dropped(&self) -> usize {
        self.dropped_not_found + self.dropped_rejected + self.dropped_retries_exhausted
    }

    pub fn has_losses(&self) -> bool {
        self.dropped() > 0
    }
}

/// One pipeline execution over a track collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    pub run_id: Uuid,
    pub state: PipelineState,
    /// Surviving tracks in playlist order
    pub tracks: Vec<Track>,
    /// Tracks supplied to the run
    pub input_count: usize,
    pub stages: Vec<(Stage, StageStats)>,
    pub transitions: Vec<StateTransition>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl PipelineRun {
    pub fn new(tracks: Vec<Track>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            state: PipelineState::Pending,
            input_count: tracks.len(),
            tracks,
            stages: Vec::new(),
            transitions: Vec::new(),
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    /// Transition to new state
    pub fn transition_to(&mut self, new_state: PipelineState) -> &StateTransition {
        self.transitions.push(StateTransition {
            old_state: self.state,
            new_state,
            transitioned_at: Utc::now(),
        });
        self.state = new_state;

        if new_state.is_terminal() {
            self.ended_at = Some(Utc::now());
        }

        &self.transitions[self.transitions.len() - 1]
    }

    pub fn record_stage(&mut self, stage: Stage, stats: StageStats) {
        self.stages.push((stage, stats));
    }

    pub fn stage_stats(&self, stage: Stage) -> Option<&StageStats> {
        self.stages.iter().find(|(s, _)| *s == stage).map(|(_, stats)| stats)
    }

    /// Items lost across all stages
    pub fn total_dropped(&self) -> usize {
        self.stages.iter().map(|(_, stats)| stats.dropped()).sum()
    }

    pub fn visited_states(&self) -> Vec<PipelineState> {
        self.transitions.iter().map(|t| t.new_state).collect()
    }
}
