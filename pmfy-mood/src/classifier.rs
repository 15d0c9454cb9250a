//! Mood classifier adapter
//!
//! Validates and orders feature columns by name before handing a single
//! matrix to the opaque classifier, then maps integer outputs to labels.

use crate::clients::Classifier;
use crate::error::PipelineError;
use crate::models::{FeatureColumn, FeatureMatrix, FeatureVector, MoodLabel, Track};
use std::sync::Arc;

pub struct MoodClassifier {
    classifier: Arc<dyn Classifier>,
}

impl MoodClassifier {
    pub fn new(classifier: Arc<dyn Classifier>) -> Self {
        Self { classifier }
    }

    /// Build the canonical-order matrix for `tracks`
    ///
    /// Fails on the first track lacking any column, before any row is built.
    pub fn assemble(tracks: &[Track]) -> Result<FeatureMatrix, PipelineError> {
        let vectors = tracks
            .iter()
            .map(|track| {
                let missing = match &track.features {
                    Some(features) => match features.to_vector() {
                        Ok(vector) => return Ok(vector),
                        Err(missing) => missing,
                    },
                    None => FeatureColumn::ALL.to_vec(),
                };
                Err(PipelineError::Schema {
                    title: track.title.clone(),
                    artist: track.artist.clone(),
                    missing,
                })
            })
            .collect::<Result<Vec<FeatureVector>, PipelineError>>()?;

        Ok(FeatureMatrix::from_vectors(&vectors))
    }

    /// Label every track, one classifier call for the whole batch
    pub async fn classify(&self, tracks: &[Track]) -> Result<Vec<MoodLabel>, PipelineError> {
        let matrix = Self::assemble(tracks)?;
        if matrix.is_empty() {
            return Ok(Vec::new());
        }

        let raw = self.classifier.predict(&matrix).await?;

        if raw.len() != matrix.len() {
            return Err(PipelineError::Classification(format!(
                "classifier returned {} labels for {} tracks",
                raw.len(),
                matrix.len()
            )));
        }

        raw.into_iter()
            .map(|value| {
                MoodLabel::try_from(value).map_err(|e| PipelineError::Classification(e.to_string()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FeatureSet;

    fn complete_features(energy: f64) -> FeatureSet {
        FeatureColumn::ALL
            .into_iter()
            .map(|c| (c, if c == FeatureColumn::Energy { energy } else { 0.5 }))
            .collect()
    }

    #[test]
    fn test_assemble_rows_in_track_order() {
        let tracks = vec![
            Track::new(0, "a", "x").with_features(complete_features(0.1)),
            Track::new(1, "b", "y").with_features(complete_features(0.9)),
        ];

        let matrix = MoodClassifier::assemble(&tracks).unwrap();
        assert_eq!(matrix.columns[1], "energy");
        assert_eq!(matrix.rows[0][1], 0.1);
        assert_eq!(matrix.rows[1][1], 0.9);
    }

    #[test]
    fn test_track_without_features_names_every_column() {
        let tracks = vec![Track::new(0, "Song", "Band")];
        match MoodClassifier::assemble(&tracks) {
            Err(PipelineError::Schema { title, missing, .. }) => {
                assert_eq!(title, "Song");
                assert_eq!(missing.len(), 8);
            }
            other => panic!("expected schema error, got {:?}", other),
        }
    }
}
