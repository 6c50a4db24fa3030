//! Manifest and category index wire formats.
//!
//! A manifest describes one category's images and the audio clips paired
//! with them, so the runtime never has to list directories. The category
//! index names every category that has a manifest.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

pub mod builder;

pub use builder::{BuildError, BuildSummary, ManifestBuilder};

/// Per-category manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryManifest {
    pub category: String,
    #[serde(rename = "lastUpdated")]
    pub generated_at: DateTime<Utc>,
    /// Every content image, sorted lexicographically.
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub audio_matches: usize,
    /// Images that have a paired audio clip.
    #[serde(default)]
    pub items: Vec<ManifestItem>,
}

/// An image paired with its audio clip
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestItem {
    pub image: String,
    pub audio: Option<String>,
    pub base_name: String,
}

/// Global list of categories
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryIndex {
    #[serde(rename = "lastUpdated")]
    pub generated_at: DateTime<Utc>,
    #[serde(default)]
    pub categories: Vec<String>,
}

impl CategoryManifest {
    /// Assemble a manifest, keeping `audio_matches` in step with `items`.
    pub fn new(category: impl Into<String>, images: Vec<String>, items: Vec<ManifestItem>) -> Self {
        let audio_matches = items.iter().filter(|item| item.audio.is_some()).count();
        Self {
            category: category.into(),
            generated_at: Utc::now(),
            images,
            audio_matches,
            items,
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let manifest: CategoryManifest = serde_json::from_str(raw)
            .map_err(|e| AppError::InvariantViolation(format!("Malformed manifest: {}", e)))?;
        manifest.check()?;
        Ok(manifest)
    }

    /// Verify the counters agree with the item list.
    pub fn check(&self) -> Result<()> {
        let with_audio = self.items.iter().filter(|item| item.audio.is_some()).count();
        if self.audio_matches != with_audio {
            return Err(AppError::InvariantViolation(format!(
                "Manifest for '{}' reports {} audio matches but lists {}",
                self.category, self.audio_matches, with_audio
            )));
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl CategoryIndex {
    /// Sorted, deduplicated index so regenerated files diff cleanly.
    pub fn new<I, S>(categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut categories: Vec<String> = categories.into_iter().map(Into::into).collect();
        categories.sort();
        categories.dedup();
        Self { generated_at: Utc::now(), categories }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        serde_json::from_str(raw)
            .map_err(|e| AppError::InvariantViolation(format!("Malformed category index: {}", e)))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(base: &str, audio: Option<&str>) -> ManifestItem {
        ManifestItem {
            image: format!("{}.png", base),
            audio: audio.map(str::to_string),
            base_name: base.to_string(),
        }
    }

    #[test]
    fn test_audio_matches_tracks_items() {
        let manifest = CategoryManifest::new(
            "animals",
            vec!["cat.png".to_string(), "dog.jpg".to_string()],
            vec![item("cat", Some("cat.mp3"))],
        );
        assert_eq!(manifest.audio_matches, 1);
        assert!(manifest.check().is_ok());
    }

    #[test]
    fn test_wire_field_names() {
        let manifest = CategoryManifest::new("animals", vec!["cat.png".to_string()], vec![item("cat", Some("cat.mp3"))]);
        let json: serde_json::Value = serde_json::from_str(&manifest.to_json().unwrap()).unwrap();

        assert!(json.get("lastUpdated").is_some());
        assert_eq!(json["audioMatches"], 1);
        assert_eq!(json["items"][0]["baseName"], "cat");
        assert_eq!(json["items"][0]["audio"], "cat.mp3");
    }

    #[test]
    fn test_parse_rejects_inconsistent_counts() {
        let raw = r#"{
            "category": "animals",
            "lastUpdated": "2024-01-01T00:00:00.000Z",
            "images": ["cat.png"],
            "audioMatches": 3,
            "items": [{"image": "cat.png", "audio": "cat.mp3", "baseName": "cat"}]
        }"#;
        assert!(matches!(CategoryManifest::parse(raw), Err(AppError::InvariantViolation(_))));
        assert!(matches!(CategoryManifest::parse("[1, 2]"), Err(AppError::InvariantViolation(_))));
    }

    #[test]
    fn test_index_is_sorted_and_deduplicated() {
        let index = CategoryIndex::new(["shapes", "animals", "fruits", "animals"]);
        assert_eq!(index.categories, vec!["animals", "fruits", "shapes"]);

        let parsed = CategoryIndex::parse(&index.to_json().unwrap()).unwrap();
        assert_eq!(parsed.categories, index.categories);
    }
}
