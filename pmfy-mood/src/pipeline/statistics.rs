//! Mood distribution over classified tracks

use crate::models::{MoodLabel, Track};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Share of each label plus the most frequent one
///
/// All four labels are always present; absent labels have fraction 0.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodDistribution {
    pub fractions: BTreeMap<MoodLabel, f64>,
    pub counts: BTreeMap<MoodLabel, usize>,
    /// Most frequent label, lowest label on ties; `None` when empty
    pub mode: Option<MoodLabel>,
    pub total: usize,
}

impl MoodDistribution {
    pub fn from_labels(labels: &[MoodLabel]) -> Self {
        let mut counts: BTreeMap<MoodLabel, usize> =
            MoodLabel::ALL.into_iter().map(|label| (label, 0)).collect();
        for label in labels {
            *counts.entry(*label).or_insert(0) += 1;
        }

        let total = labels.len();
        let fractions = counts
            .iter()
            .map(|(label, count)| {
                let fraction = if total == 0 {
                    0.0
                } else {
                    *count as f64 / total as f64
                };
                (*label, fraction)
            })
            .collect();

        // BTreeMap iterates in label order, so strict > keeps the lowest on ties
        let mut mode: Option<(MoodLabel, usize)> = None;
        for (label, count) in &counts {
            if *count > 0 && mode.map_or(true, |(_, best)| *count > best) {
                mode = Some((*label, *count));
            }
        }

        Self {
            fractions,
            counts,
            mode: mode.map(|(label, _)| label),
            total,
        }
    }

    /// Distribution over labelled tracks; unlabelled tracks are ignored
    pub fn from_tracks(tracks: &[Track]) -> Self {
        let labels: Vec<MoodLabel> = tracks.iter().filter_map(|t| t.mood).collect();
        Self::from_labels(&labels)
    }

    pub fn fraction(&self, label: MoodLabel) -> f64 {
        self.fractions.get(&label).copied().unwrap_or(0.0)
    }

    pub fn count(&self, label: MoodLabel) -> usize {
        self.counts.get(&label).copied().unwrap_or(0)
    }
}
