//! Per-mood recommendations

use super::mood::MoodLabel;
use super::track::normalize;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which tier produced a recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Similar,
    Keyword,
    Fallback,
}

impl Strategy {
    /// Fallback entries may share a dedup key with another mood
    pub fn is_unique(self) -> bool {
        !matches!(self, Strategy::Fallback)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Strategy::Similar => "similar",
            Strategy::Keyword => "keyword",
            Strategy::Fallback => "fallback",
        })
    }
}

/// Candidate returned by a track search collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateTrack {
    pub title: String,
    pub artist: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl CandidateTrack {
    pub fn new(title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
            image_url: None,
        }
    }

    /// Key used for cross-mood deduplication, `None` for a blank title
    pub fn dedup_key(&self) -> Option<String> {
        if self.title.trim().is_empty() {
            return None;
        }
        Some(dedup_key(&self.title, &self.artist))
    }
}

/// Normalised `"title - artist"`
pub fn dedup_key(title: &str, artist: &str) -> String {
    format!("{} - {}", normalize(title), normalize(artist))
}

/// Accepted recommendation for one mood
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub mood: MoodLabel,
    pub title: String,
    pub artist: String,
    pub strategy: Strategy,
    pub dedup_key: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl Recommendation {
    pub fn from_candidate(mood: MoodLabel, candidate: CandidateTrack, strategy: Strategy) -> Self {
        let dedup_key = dedup_key(&candidate.title, &candidate.artist);
        Self {
            mood,
            title: candidate.title,
            artist: candidate.artist,
            strategy,
            dedup_key,
            image_url: candidate.image_url,
        }
    }
}
