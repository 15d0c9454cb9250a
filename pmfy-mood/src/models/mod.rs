//! Data models for pmfy-mood

pub mod features;
pub mod mood;
pub mod pipeline_run;
pub mod recommendation;
pub mod track;

pub use features::{FeatureColumn, FeatureMatrix, FeatureSet, FeatureVector};
pub use mood::{InvalidMoodLabel, MoodLabel};
pub use pipeline_run::{PipelineRun, PipelineState, Stage, StageStats, StateTransition};
pub use recommendation::{dedup_key, CandidateTrack, Recommendation, Strategy};
pub use track::{normalize, LookupKey, Track};
