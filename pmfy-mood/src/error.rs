//! Error types for pmfy-mood
//!
//! Per-item failures ([`FetchError`]) stay inside the batch resolver and turn
//! into [`SkipReason`]s. Only [`PipelineError`] terminates a run.

use crate::models::{FeatureColumn, Stage};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Collaborator call failure for a single item
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Timeout, 5xx, rate limiting, dropped connection
    #[error("Transient error: {0}")]
    Transient(String),

    /// Definitive miss
    #[error("Not found")]
    NotFound,

    /// Permanent failure specific to this item (bad request, unusable payload)
    #[error("Rejected: {0}")]
    Rejected(String),

    /// The whole service is unusable (auth failure, outage)
    #[error("Service unreachable: {0}")]
    Unreachable(String),
}

impl FetchError {
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Transient(_))
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, FetchError::Unreachable(_))
    }

    /// Classify an HTTP status for a single-item request
    pub fn from_status(status: u16, body: &str) -> Self {
        match status {
            401 | 403 => FetchError::Unreachable(format!("HTTP {}: {}", status, body)),
            404 => FetchError::NotFound,
            408 | 429 => FetchError::Transient(format!("HTTP {}: {}", status, body)),
            s if s >= 500 => FetchError::Transient(format!("HTTP {}: {}", status, body)),
            _ => FetchError::Rejected(format!("HTTP {}: {}", status, body)),
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() || err.is_request() {
            FetchError::Transient(err.to_string())
        } else if err.is_decode() {
            FetchError::Rejected(err.to_string())
        } else if let Some(status) = err.status() {
            FetchError::from_status(status.as_u16(), &err.to_string())
        } else {
            FetchError::Transient(err.to_string())
        }
    }
}

/// Why an item was dropped from a stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NotFound,
    Rejected,
    RetriesExhausted,
}

/// External classifier failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifierError {
    #[error("Classifier request failed: {0}")]
    Request(String),

    #[error("Classifier returned error: {0}")]
    Model(String),

    #[error("Unparseable classifier output: {0}")]
    Parse(String),
}

/// Run-level failure
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A stage's collaborator is unusable as a whole
    #[error("Stage {stage} failed: {detail}")]
    StageFailure { stage: Stage, detail: String },

    /// Track reached classification without every feature column
    #[error("Track '{title}' by '{artist}' is missing feature columns: {}", format_columns(.missing))]
    Schema {
        title: String,
        artist: String,
        missing: Vec<FeatureColumn>,
    },

    /// Classifier failed or returned labels that cannot be used
    #[error("Classification failed: {0}")]
    Classification(String),

    /// Nothing left to analyse
    #[error("No tracks left after {stage}")]
    NoTracks { stage: Stage },
}

impl PipelineError {
    /// Stage the run died in
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::StageFailure { stage, .. } | PipelineError::NoTracks { stage } => *stage,
            PipelineError::Schema { .. } | PipelineError::Classification(_) => Stage::Classification,
        }
    }
}

impl From<ClassifierError> for PipelineError {
    fn from(err: ClassifierError) -> Self {
        PipelineError::Classification(err.to_string())
    }
}

fn format_columns(columns: &[FeatureColumn]) -> String {
    columns
        .iter()
        .map(|c| c.name())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(FetchError::from_status(401, "").is_fatal());
        assert!(FetchError::from_status(403, "").is_fatal());
        assert_eq!(FetchError::from_status(404, ""), FetchError::NotFound);
        assert!(FetchError::from_status(429, "").is_transient());
        assert!(FetchError::from_status(503, "").is_transient());
        assert!(matches!(FetchError::from_status(400, "bad"), FetchError::Rejected(_)));
    }

    #[test]
    fn test_schema_error_message_lists_columns() {
        let err = PipelineError::Schema {
            title: "Song".to_string(),
            artist: "Band".to_string(),
            missing: vec![FeatureColumn::Energy, FeatureColumn::Tempo],
        };
        assert_eq!(
            err.to_string(),
            "Track 'Song' by 'Band' is missing feature columns: energy, tempo"
        );
        assert_eq!(err.stage(), Stage::Classification);
    }

    #[test]
    fn test_stage_failure_names_stage() {
        let err = PipelineError::StageFailure {
            stage: Stage::FeatureRetrieval,
            detail: "connection refused".to_string(),
        };
        assert_eq!(err.to_string(), "Stage feature_retrieval failed: connection refused");
    }
}
