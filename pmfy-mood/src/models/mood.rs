//! Mood labels
//!
//! Closed set of four categories. Integers outside 0..=3 never become a label.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Predicted emotional category of a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum MoodLabel {
    Sad = 0,
    Happy = 1,
    Energetic = 2,
    Calm = 3,
}

/// Integer outside the label range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Invalid mood label: {0} (expected 0-3)")]
pub struct InvalidMoodLabel(pub i64);

impl MoodLabel {
    /// All labels in index order
    pub const ALL: [MoodLabel; 4] = [
        MoodLabel::Sad,
        MoodLabel::Happy,
        MoodLabel::Energetic,
        MoodLabel::Calm,
    ];

    pub fn index(self) -> i64 {
        self as i64
    }

    /// Lowercase name used in reports and logs
    pub fn name(self) -> &'static str {
        match self {
            MoodLabel::Sad => "sad",
            MoodLabel::Happy => "happy",
            MoodLabel::Energetic => "energetic",
            MoodLabel::Calm => "calm",
        }
    }
}

impl TryFrom<i64> for MoodLabel {
    type Error = InvalidMoodLabel;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(MoodLabel::Sad),
            1 => Ok(MoodLabel::Happy),
            2 => Ok(MoodLabel::Energetic),
            3 => Ok(MoodLabel::Calm),
            other => Err(InvalidMoodLabel(other)),
        }
    }
}

impl From<MoodLabel> for i64 {
    fn from(label: MoodLabel) -> Self {
        label.index()
    }
}

impl fmt::Display for MoodLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
