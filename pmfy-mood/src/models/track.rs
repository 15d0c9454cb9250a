//! Track records flowing through the pipeline

use super::features::FeatureSet;
use super::mood::MoodLabel;
use serde::{Deserialize, Serialize};

/// A playlist track, enriched stage by stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// 0-based index in the source playlist
    pub position: usize,
    pub title: String,
    pub artist: String,
    /// Identity assigned by the identity resolver
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<FeatureSet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood: Option<MoodLabel>,
}

impl Track {
    pub fn new(position: usize, title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            position,
            title: title.into(),
            artist: artist.into(),
            external_id: None,
            features: None,
            mood: None,
        }
    }

    pub fn with_external_id(mut self, id: impl Into<String>) -> Self {
        self.external_id = Some(id.into());
        self
    }

    pub fn with_features(mut self, features: FeatureSet) -> Self {
        self.features = Some(features);
        self
    }

    /// Features present for all eight columns
    pub fn has_complete_features(&self) -> bool {
        self.features.as_ref().is_some_and(FeatureSet::is_complete)
    }

    /// Lookup key derived from title and artist
    pub fn lookup_key(&self) -> LookupKey {
        LookupKey::track(&self.title, &self.artist)
    }
}

/// Normalised cache key
///
/// Title/artist keys ignore case, surrounding whitespace and repeated inner
/// whitespace, so "Blinding  Lights " and "blinding lights" collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LookupKey {
    Track { title: String, artist: String },
    Id(String),
}

impl LookupKey {
    pub fn track(title: &str, artist: &str) -> Self {
        LookupKey::Track {
            title: normalize(title),
            artist: normalize(artist),
        }
    }

    pub fn id(id: &str) -> Self {
        LookupKey::Id(id.trim().to_string())
    }
}

impl std::fmt::Display for LookupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LookupKey::Track { title, artist } => write!(f, "{} - {}", title, artist),
            LookupKey::Id(id) => write!(f, "id:{}", id),
        }
    }
}

/// Lowercase, trim and collapse inner whitespace
pub fn normalize(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_key_normalisation() {
        let a = LookupKey::track("  Blinding   Lights ", "The WEEKND");
        let b = LookupKey::track("blinding lights", "the weeknd");
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "blinding lights - the weeknd");
    }

    #[test]
    fn test_id_key_trims() {
        assert_eq!(LookupKey::id(" abc "), LookupKey::Id("abc".to_string()));
    }

    #[test]
    fn test_incomplete_features() {
        let track = Track::new(0, "a", "b")
            .with_features(FeatureSet::from_named(vec![("energy", 0.5)]));
        assert!(!track.has_complete_features());
        assert!(!Track::new(1, "a", "b").has_complete_features());
    }
}
