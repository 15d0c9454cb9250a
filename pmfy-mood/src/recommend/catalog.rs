//! Search keywords and curated fallback tracks per mood

use crate::models::{CandidateTrack, MoodLabel};

/// Per-mood keyword variants and guaranteed fallback track
#[derive(Debug, Clone)]
pub struct MoodCatalog {
    keywords: [Vec<String>; 4],
    fallbacks: [CandidateTrack; 4],
}

fn slot(mood: MoodLabel) -> usize {
    mood.index() as usize
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| w.to_string()).collect()
}

fn curated(title: &str, artist: &str, image_url: &str) -> CandidateTrack {
    CandidateTrack {
        title: title.to_string(),
        artist: artist.to_string(),
        image_url: Some(image_url.to_string()),
    }
}

impl Default for MoodCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl MoodCatalog {
    /// Keywords lead with the mood name itself
    pub fn builtin() -> Self {
        Self {
            keywords: [
                words(&["sad", "melancholy", "heartbreak", "lonely"]),
                words(&["happy", "feel good", "sunshine", "joy"]),
                words(&["energetic", "workout", "power", "dance"]),
                words(&["calm", "relax", "chill", "ambient"]),
            ],
            fallbacks: [
                curated(
                    "Someone Like You",
                    "Adele",
                    "https://e-cdns-images.dzcdn.net/images/cover/2582df73d9c5436414b9eb8880e5be54/500x500-000000-80-0-0.jpg",
                ),
                curated(
                    "Walking on Sunshine",
                    "Katrina & The Waves",
                    "https://e-cdns-images.dzcdn.net/images/cover/4a3d98d6e5c2f5d5c5c5c5c5c5c5c5c5/500x500-000000-80-0-0.jpg",
                ),
                curated(
                    "Shut Up and Dance",
                    "Walk the Moon",
                    "https://e-cdns-images.dzcdn.net/images/cover/3f0f4d7e1b9c5e5d5c5c5c5c5c5c5c5c/500x500-000000-80-0-0.jpg",
                ),
                curated(
                    "Weightless",
                    "Marconi Union",
                    "https://e-cdns-images.dzcdn.net/images/cover/5e8c9d1f0a7b5e5d5c5c5c5c5c5c5c5c/500x500-000000-80-0-0.jpg",
                ),
            ],
        }
    }

    pub fn keywords(&self, mood: MoodLabel) -> &[String] {
        &self.keywords[slot(mood)]
    }

    pub fn fallback(&self, mood: MoodLabel) -> &CandidateTrack {
        &self.fallbacks[slot(mood)]
    }

    pub fn with_keywords<I, S>(mut self, mood: MoodLabel, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords[slot(mood)] = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_fallback(mut self, mood: MoodLabel, track: CandidateTrack) -> Self {
        self.fallbacks[slot(mood)] = track;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_covers_every_mood() {
        let catalog = MoodCatalog::builtin();
        for mood in MoodLabel::ALL {
            assert_eq!(catalog.keywords(mood)[0], mood.name());
            assert!(catalog.fallback(mood).dedup_key().is_some());
        }
        assert_eq!(catalog.fallback(MoodLabel::Calm).title, "Weightless");
    }

    #[test]
    fn test_overrides() {
        let catalog = MoodCatalog::builtin()
            .with_keywords(MoodLabel::Sad, ["blue"])
            .with_fallback(MoodLabel::Sad, CandidateTrack::new("Hurt", "Johnny Cash"));
        assert_eq!(catalog.keywords(MoodLabel::Sad), ["blue".to_string()]);
        assert_eq!(catalog.fallback(MoodLabel::Sad).artist, "Johnny Cash");
    }
}
