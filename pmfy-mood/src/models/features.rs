//! Audio feature columns
//!
//! Features arrive keyed by name in whatever order the source produced them
//! ([`FeatureSet`]). The classifier consumes them positionally, so every
//! conversion to a row goes through [`FeatureColumn::ALL`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// One of the eight classifier input columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureColumn {
    Danceability,
    Energy,
    Speechiness,
    Acousticness,
    Instrumentalness,
    Liveness,
    Valence,
    Tempo,
}

impl FeatureColumn {
    /// Canonical column order expected by the classifier
    pub const ALL: [FeatureColumn; 8] = [
        FeatureColumn::Danceability,
        FeatureColumn::Energy,
        FeatureColumn::Speechiness,
        FeatureColumn::Acousticness,
        FeatureColumn::Instrumentalness,
        FeatureColumn::Liveness,
        FeatureColumn::Valence,
        FeatureColumn::Tempo,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FeatureColumn::Danceability => "danceability",
            FeatureColumn::Energy => "energy",
            FeatureColumn::Speechiness => "speechiness",
            FeatureColumn::Acousticness => "acousticness",
            FeatureColumn::Instrumentalness => "instrumentalness",
            FeatureColumn::Liveness => "liveness",
            FeatureColumn::Valence => "valence",
            FeatureColumn::Tempo => "tempo",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }

    /// Column names in canonical order
    pub fn names() -> [&'static str; 8] {
        Self::ALL.map(FeatureColumn::name)
    }
}

impl fmt::Display for FeatureColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Features keyed by column, possibly incomplete
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureSet(HashMap<FeatureColumn, f64>);

impl FeatureSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(name, value)` pairs, ignoring names that are not columns
    pub fn from_named<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        Self(
            pairs
                .into_iter()
                .filter_map(|(name, value)| FeatureColumn::from_name(name).map(|c| (c, value)))
                .collect(),
        )
    }

    pub fn insert(&mut self, column: FeatureColumn, value: f64) {
        self.0.insert(column, value);
    }

    pub fn get(&self, column: FeatureColumn) -> Option<f64> {
        self.0.get(&column).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Columns absent from this set, in canonical order
    pub fn missing(&self) -> Vec<FeatureColumn> {
        FeatureColumn::ALL
            .into_iter()
            .filter(|c| !self.0.contains_key(c))
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing().is_empty()
    }

    /// Ordered vector, or the missing columns
    pub fn to_vector(&self) -> Result<FeatureVector, Vec<FeatureColumn>> {
        let missing = self.missing();
        if !missing.is_empty() {
            return Err(missing);
        }
        let value = |c| self.0[&c];
        Ok(FeatureVector {
            danceability: value(FeatureColumn::Danceability),
            energy: value(FeatureColumn::Energy),
            speechiness: value(FeatureColumn::Speechiness),
            acousticness: value(FeatureColumn::Acousticness),
            instrumentalness: value(FeatureColumn::Instrumentalness),
            liveness: value(FeatureColumn::Liveness),
            valence: value(FeatureColumn::Valence),
            tempo: value(FeatureColumn::Tempo),
        })
    }
}

impl FromIterator<(FeatureColumn, f64)> for FeatureSet {
    fn from_iter<T: IntoIterator<Item = (FeatureColumn, f64)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Complete feature vector with all eight columns
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub danceability: f64,
    pub energy: f64,
    pub speechiness: f64,
    pub acousticness: f64,
    pub instrumentalness: f64,
    pub liveness: f64,
    pub valence: f64,
    pub tempo: f64,
}

impl FeatureVector {
    pub fn get(&self, column: FeatureColumn) -> f64 {
        match column {
            FeatureColumn::Danceability => self.danceability,
            FeatureColumn::Energy => self.energy,
            FeatureColumn::Speechiness => self.speechiness,
            FeatureColumn::Acousticness => self.acousticness,
            FeatureColumn::Instrumentalness => self.instrumentalness,
            FeatureColumn::Liveness => self.liveness,
            FeatureColumn::Valence => self.valence,
            FeatureColumn::Tempo => self.tempo,
        }
    }

    /// Values in canonical column order
    pub fn to_row(&self) -> [f64; 8] {
        FeatureColumn::ALL.map(|c| self.get(c))
    }
}

impl From<FeatureVector> for FeatureSet {
    fn from(vector: FeatureVector) -> Self {
        FeatureColumn::ALL
            .into_iter()
            .map(|c| (c, vector.get(c)))
            .collect()
    }
}

/// Column-ordered matrix handed to the classifier
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureMatrix {
    pub columns: [&'static str; 8],
    pub rows: Vec<[f64; 8]>,
}

impl FeatureMatrix {
    pub fn from_vectors<'a, I>(vectors: I) -> Self
    where
        I: IntoIterator<Item = &'a FeatureVector>,
    {
        Self {
            columns: FeatureColumn::names(),
            rows: vectors.into_iter().map(FeatureVector::to_row).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
