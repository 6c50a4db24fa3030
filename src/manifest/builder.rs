use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{CategoryIndex, CategoryManifest, ManifestItem};
use crate::config::ContentConfig;
use crate::error::{AppError, Result};
use crate::media::{base_name, find_matching_audio, is_content_image};
use crate::store::ContentStore;

/// Build-time generator for category manifests and the category index.
///
/// Every run rewrites its output wholesale; nothing is merged with what a
/// previous run produced, so deleted files never linger in a manifest.
pub struct ManifestBuilder {
    store: Arc<dyn ContentStore>,
    content: ContentConfig,
}

impl ManifestBuilder {
    pub fn new(store: Arc<dyn ContentStore>, content: ContentConfig) -> Self {
        Self { store, content }
    }

    /// Regenerate every category manifest and the category index.
    ///
    /// A failing category is recorded in the summary and the remaining
    /// categories are still processed.
    pub async fn build_all(&self) -> Result<BuildSummary> {
        info!("Scanning content directories under {}", self.content.root);

        self.ensure_directory_exists(&self.content.images_dir).await?;
        self.ensure_directory_exists(&self.content.audio_dir).await?;

        let categories = self.list_categories().await?;
        info!("Found {} categories: {}", categories.len(), categories.join(", "));

        let mut summary = BuildSummary::default();
        for category in &categories {
            debug!("Processing category: {}", category);
            match self.build_category(category).await {
                Ok(manifest) => summary.manifests.push(manifest),
                Err(e) => {
                    warn!("Failed to build manifest for {}: {}", category, e);
                    summary.errors.push(BuildError {
                        category: category.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        summary.index = Some(self.build_index(&categories).await?);

        Ok(summary)
    }

    /// Pair every image of `category` with its audio clip and persist the manifest.
    pub async fn build_category(&self, category: &str) -> Result<CategoryManifest> {
        let images = self.scan_images(category).await;
        let audio_dir = self.content.category_audio_dir(category);

        let mut items = Vec::new();
        for image in &images {
            let base = base_name(image);
            if let Some(audio) =
                find_matching_audio(self.store.as_ref(), &audio_dir, &base, &self.content.audio_extensions).await
            {
                items.push(ManifestItem {
                    image: image.clone(),
                    audio: Some(audio),
                    base_name: base,
                });
            }
        }

        let manifest = CategoryManifest::new(category, images, items);
        let manifest_path = self.content.manifest_path(category);
        self.store.write(&manifest_path, &manifest.to_json()?).await?;

        info!(
            "Generated manifest for {}: {} images, {} with audio",
            category,
            manifest.images.len(),
            manifest.audio_matches
        );

        Ok(manifest)
    }

    /// Persist the sorted category index.
    pub async fn build_index(&self, categories: &[String]) -> Result<CategoryIndex> {
        let index = CategoryIndex::new(categories.iter().cloned());
        self.store.write(&self.content.index_file, &index.to_json()?).await?;

        info!("Generated categories list: {} categories", index.categories.len());
        Ok(index)
    }

    /// Category directories under the images root, hidden entries excluded.
    ///
    /// A missing images root is created and yields no categories.
    async fn list_categories(&self) -> Result<Vec<String>> {
        let entries = match self.store.list(&self.content.images_dir).await {
            Ok(entries) => entries,
            Err(e) if e.is_not_found() => {
                warn!("Images directory not found, creating it: {}", self.content.images_dir);
                self.store.create_dir_all(&self.content.images_dir).await?;
                return Ok(Vec::new());
            }
            Err(e) => return Err(AppError::from(e)),
        };

        let mut categories: Vec<String> = entries
            .into_iter()
            .filter(|entry| entry.is_dir && !entry.is_hidden())
            .map(|entry| entry.name)
            .collect();
        categories.sort();

        Ok(categories)
    }

    /// Content images of a category, sorted. A missing directory yields none.
    async fn scan_images(&self, category: &str) -> Vec<String> {
        let directory = self.content.category_images_dir(category);

        let entries = match self.store.list(&directory).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Could not scan images in {}: {}", directory, e);
                return Vec::new();
            }
        };

        let mut images: Vec<String> = entries
            .into_iter()
            .filter(|entry| !entry.is_dir)
            .map(|entry| entry.name)
            .filter(|name| is_content_image(name, &self.content.image_extensions, &self.content.cover_file))
            .collect();
        images.sort();

        images
    }

    async fn ensure_directory_exists(&self, directory: &str) -> Result<()> {
        if !self.store.probe(directory).await {
            self.store.create_dir_all(directory).await?;
            info!("Created directory: {}", directory);
        }
        Ok(())
    }
}

/// Outcome of a full manifest build
#[derive(Debug, Clone, Default)]
pub struct BuildSummary {
    pub manifests: Vec<CategoryManifest>,
    pub index: Option<CategoryIndex>,
    pub errors: Vec<BuildError>,
}

impl BuildSummary {
    pub fn total_images(&self) -> usize {
        self.manifests.iter().map(|m| m.images.len()).sum()
    }

    pub fn total_audio_matches(&self) -> usize {
        self.manifests.iter().map(|m| m.audio_matches).sum()
    }

    pub fn summary(&self) -> String {
        format!(
            "Built {} manifests: {} images, {} with audio, {} errors",
            self.manifests.len(),
            self.total_images(),
            self.total_audio_matches(),
            self.errors.len()
        )
    }
}

/// A category whose manifest could not be written
#[derive(Debug, Clone)]
pub struct BuildError {
    pub category: String,
    pub error: String,
}
