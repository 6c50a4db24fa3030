use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::ContentConfig;
use crate::manifest::{CategoryIndex, CategoryManifest};
use crate::media::{base_name, display_name, find_matching_audio, is_content_image};
use crate::store::{join, ContentStore};

/// A media item ready for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub id: String,
    pub name: String,
    pub category: String,
    pub image_path: String,
    pub audio_path: Option<String>,
    pub display_name: String,
}

/// Runtime resolver turning category manifests into display items.
///
/// One instance is meant to live for the whole process. Results are cached
/// per category with no expiry; call [`ContentResolver::clear_cache`] when
/// fresh data is required.
pub struct ContentResolver {
    store: Arc<dyn ContentStore>,
    content: ContentConfig,
    cache: RwLock<HashMap<String, Arc<Vec<ContentItem>>>>,
}

impl ContentResolver {
    pub fn new(store: Arc<dyn ContentStore>, content: ContentConfig) -> Self {
        Self {
            store,
            content,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Display items of `category`.
    ///
    /// Served from cache when present; otherwise loaded from the category
    /// manifest, or discovered when no manifest is reachable. Never fails:
    /// the worst case is an empty, cached list.
    pub async fn scan_category(&self, category: &str) -> Arc<Vec<ContentItem>> {
        if let Some(items) = self.cache.read().await.get(category) {
            return items.clone();
        }

        let items = match self.load_from_manifest(category).await {
            Some(items) => items,
            None => self.auto_discover(category).await,
        };

        let items = Arc::new(items);
        self.cache
            .write()
            .await
            .insert(category.to_string(), items.clone());
        items
    }

    /// Evict one category, or everything when `category` is `None`.
    pub async fn clear_cache(&self, category: Option<&str>) {
        let mut cache = self.cache.write().await;
        match category {
            Some(category) => {
                cache.remove(category);
            }
            None => cache.clear(),
        }
    }

    /// Resolve a category and hint the store to warm its images.
    ///
    /// Hints run in the background and their failures never affect the
    /// returned items.
    pub async fn preload_category(&self, category: &str) -> Arc<Vec<ContentItem>> {
        let items = self.scan_category(category).await;
        let images_dir = self.content.category_images_dir(category);

        for item in items.iter() {
            let Some(file) = item.image_path.rsplit('/').next() else {
                continue;
            };
            let path = join(&[&images_dir, file]);
            let store = self.store.clone();
            tokio::spawn(async move {
                store.prefetch(&path).await;
            });
        }

        items
    }

    /// Categories from the deployed index, or the built-in list when the
    /// index cannot be read.
    pub async fn get_available_categories(&self) -> Vec<String> {
        let index_path = &self.content.index_file;

        match self.store.fetch(index_path).await {
            Ok(raw) => match CategoryIndex::parse(&raw) {
                Ok(index) => return index.categories,
                Err(e) => warn!("Ignoring category index {}: {}", index_path, e),
            },
            Err(e) => warn!("Could not load categories list {}: {}", index_path, e),
        }

        self.content.fallback_categories.clone()
    }

    /// Categories currently held in the cache, sorted
    pub async fn cached_categories(&self) -> Vec<String> {
        let mut categories: Vec<String> = self.cache.read().await.keys().cloned().collect();
        categories.sort();
        categories
    }

    async fn load_from_manifest(&self, category: &str) -> Option<Vec<ContentItem>> {
        let manifest_path = self.content.manifest_path(category);

        let raw = match self.store.fetch(&manifest_path).await {
            Ok(raw) => raw,
            Err(e) if e.is_not_found() => {
                warn!("No manifest found for {}, falling back to auto-discovery", category);
                return None;
            }
            Err(e) => {
                warn!("Failed to load manifest {}: {}", manifest_path, e);
                return None;
            }
        };

        match CategoryManifest::parse(&raw) {
            Ok(manifest) => Some(self.process_manifest_items(category, &manifest.images).await),
            Err(e) => {
                warn!("Ignoring manifest {}: {}", manifest_path, e);
                None
            }
        }
    }

    /// Build display items for image files of a category.
    ///
    /// Audio is re-matched against the live tree instead of trusting the
    /// paths stored in the manifest, which may be stale.
    // TODO: trust manifest audio entries when the manifest is newer than the audio directory, to skip redundant probes.
    async fn process_manifest_items(&self, category: &str, images: &[String]) -> Vec<ContentItem> {
        let images_dir = self.content.category_images_dir(category);
        let audio_dir = self.content.category_audio_dir(category);

        let mut items = Vec::with_capacity(images.len());
        for image in images {
            let base = base_name(image);
            let audio_path =
                find_matching_audio(self.store.as_ref(), &audio_dir, &base, &self.content.audio_extensions)
                    .await
                    .map(|file| self.content.public_url(&join(&[&audio_dir, &file])));

            items.push(ContentItem {
                id: base.clone(),
                name: base.clone(),
                category: category.to_string(),
                image_path: self.content.public_url(&join(&[&images_dir, image])),
                audio_path,
                display_name: display_name(&base),
            });
        }

        items
    }

    async fn auto_discover(&self, category: &str) -> Vec<ContentItem> {
        if !self.store.supports_listing() {
            warn!(
                "Auto-discovery not available for {}. Please create {}",
                category,
                self.content.manifest_path(category)
            );
            return Vec::new();
        }

        let images_dir = self.content.category_images_dir(category);
        let entries = match self.store.list(&images_dir).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Auto-discovery failed for {}: {}", category, e);
                return Vec::new();
            }
        };

        let mut images: Vec<String> = entries
            .into_iter()
            .filter(|entry| !entry.is_dir && !entry.is_hidden())
            .map(|entry| entry.name)
            .filter(|name| is_content_image(name, &self.content.image_extensions, &self.content.cover_file))
            .collect();
        images.sort();

        debug!("Auto-discovered {} images for {}", images.len(), category);
        self.process_manifest_items(category, &images).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{StoreEntry, StoreError};
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fetch/probe-only store that counts every I/O call.
    #[derive(Default)]
    struct CountingStore {
        files: HashMap<String, String>,
        existing: HashSet<String>,
        calls: AtomicUsize,
    }

    impl CountingStore {
        fn with_file(mut self, path: &str, body: &str) -> Self {
            self.files.insert(path.to_string(), body.to_string());
            self.existing.insert(path.to_string());
            self
        }

        fn with_existing(mut self, path: &str) -> Self {
            self.existing.insert(path.to_string());
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl ContentStore for CountingStore {
        async fn fetch(&self, path: &str) -> Result<String, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.files
                .get(path)
                .cloned()
                .ok_or_else(|| StoreError::NotFound { path: path.to_string() })
        }

        async fn probe(&self, path: &str) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.existing.contains(path)
        }
    }

    /// Store that can list but has no manifests.
    struct ListingStore {
        entries: Vec<StoreEntry>,
    }

    #[async_trait::async_trait]
    impl ContentStore for ListingStore {
        async fn fetch(&self, path: &str) -> Result<String, StoreError> {
            Err(StoreError::NotFound { path: path.to_string() })
        }

        async fn probe(&self, path: &str) -> bool {
            path == "audio/colors/red.ogg"
        }

        async fn list(&self, _path: &str) -> Result<Vec<StoreEntry>, StoreError> {
            Ok(self.entries.clone())
        }

        fn supports_listing(&self) -> bool {
            true
        }
    }

    const ANIMALS_MANIFEST: &str = r#"{
        "category": "animals",
        "lastUpdated": "2024-05-01T10:00:00.000Z",
        "images": ["cat.png", "dog.jpg", "polar-bear.png"],
        "audioMatches": 1,
        "items": [{"image": "dog.jpg", "audio": "dog.mp3", "baseName": "dog"}]
    }"#;

    fn resolver(store: Arc<dyn ContentStore>) -> ContentResolver {
        ContentResolver::new(store, ContentConfig::default())
    }

    #[tokio::test]
    async fn test_manifest_items_rematch_audio() {
        // The manifest claims dog.mp3, but only cat.wav exists now.
        let store = CountingStore::default()
            .with_file("images/animals/manifest.json", ANIMALS_MANIFEST)
            .with_existing("audio/animals/cat.wav");
        let resolver = resolver(Arc::new(store));

        let items = resolver.scan_category("animals").await;

        assert_eq!(items.len(), 3);
        assert_eq!(items[0].id, "cat");
        assert_eq!(items[0].image_path, "/content/images/animals/cat.png");
        assert_eq!(items[0].audio_path.as_deref(), Some("/content/audio/animals/cat.wav"));
        assert_eq!(items[1].audio_path, None);
        assert_eq!(items[2].display_name, "Polar Bear");
    }

    #[tokio::test]
    async fn test_second_scan_is_served_from_cache() {
        let store = Arc::new(
            CountingStore::default().with_file("images/animals/manifest.json", ANIMALS_MANIFEST),
        );
        let resolver = resolver(store.clone());

        let first = resolver.scan_category("animals").await;
        let calls_after_first = store.calls();
        let second = resolver.scan_category("animals").await;

        assert_eq!(first, second);
        assert_eq!(store.calls(), calls_after_first);

        resolver.clear_cache(Some("animals")).await;
        resolver.scan_category("animals").await;
        assert!(store.calls() > calls_after_first);
    }

    #[tokio::test]
    async fn test_missing_manifest_without_listing_is_empty_and_cached() {
        let store = Arc::new(CountingStore::default());
        let resolver = resolver(store.clone());

        assert!(resolver.scan_category("insects").await.is_empty());
        let calls = store.calls();
        assert!(resolver.scan_category("insects").await.is_empty());
        assert_eq!(store.calls(), calls);
        assert_eq!(resolver.cached_categories().await, vec!["insects"]);
    }

    #[tokio::test]
    async fn test_malformed_manifest_falls_back() {
        let store = CountingStore::default().with_file("images/animals/manifest.json", "{ not json");
        let resolver = resolver(Arc::new(store));

        assert!(resolver.scan_category("animals").await.is_empty());
    }

    #[tokio::test]
    async fn test_auto_discovery_with_listing_store() {
        let store = ListingStore {
            entries: vec![
                StoreEntry::file("red.png"),
                StoreEntry::file("blue.png"),
                StoreEntry::file("cover.jpg"),
                StoreEntry::file(".DS_Store"),
                StoreEntry::dir("extra.png"),
            ],
        };
        let resolver = resolver(Arc::new(store));

        let items = resolver.scan_category("colors").await;
        let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();

        assert_eq!(ids, vec!["blue", "red"]);
        assert_eq!(items[1].audio_path.as_deref(), Some("/content/audio/colors/red.ogg"));
    }

    #[tokio::test]
    async fn test_clear_all() {
        let resolver = resolver(Arc::new(CountingStore::default()));
        resolver.scan_category("animals").await;
        resolver.scan_category("fruits").await;

        resolver.clear_cache(None).await;
        assert!(resolver.cached_categories().await.is_empty());
    }

    #[tokio::test]
    async fn test_available_categories_from_index() {
        let store = CountingStore::default().with_file(
            "categories.json",
            r#"{"lastUpdated": "2024-05-01T10:00:00Z", "categories": ["animals", "fruits"]}"#,
        );
        let resolver = resolver(Arc::new(store));

        assert_eq!(resolver.get_available_categories().await, vec!["animals", "fruits"]);
    }

    #[tokio::test]
    async fn test_available_categories_fallback() {
        let resolver = resolver(Arc::new(CountingStore::default()));

        let categories = resolver.get_available_categories().await;
        assert_eq!(categories.len(), 13);
        assert_eq!(categories[0], "animals");
    }

    #[tokio::test]
    async fn test_preload_returns_items() {
        let store = CountingStore::default().with_file("images/animals/manifest.json", ANIMALS_MANIFEST);
        let resolver = resolver(Arc::new(store));

        let items = resolver.preload_category("animals").await;
        assert_eq!(items.len(), 3);
    }
}
