//! Integration tests for the content pipeline
//!
//! These tests build manifests over a real directory tree and read them back
//! through the runtime services, the same way the CLI does.

use soflu::config::AppConfig;
use soflu::manifest::CategoryManifest;
use soflu::navigation::{LoadState, ViewKind};
use soflu::state::AppState;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const NAVIGATION: &str = r#"{
  "main": [
    { "id": "skills", "route": "/skills", "labelKey": "nav.skills", "icon": "🧠",
      "children": [
        { "id": "animals", "route": "/animals", "labelKey": "categories.animals",
          "coverImage": "/content/images/animals/cover.jpg" },
        { "id": "fruits", "route": "/fruits", "labelKey": "categories.fruits" }
      ] },
    { "id": "stories", "route": "/stories", "labelKey": "nav.stories",
      "children": [ { "id": "three-bears", "route": "/three-bears", "labelKey": "stories.threeBears" } ] },
    { "id": "parent-guide", "route": "/parent-guide", "labelKey": "nav.parentGuide" }
  ]
}"#;

fn touch(root: &Path, relative: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, b"data").unwrap();
}

fn state_for(root: &Path) -> AppState {
    let mut config = AppConfig::default();
    config.content.root = root.to_string_lossy().to_string();
    AppState::new(config)
}

fn sample_tree() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();

    touch(root, "images/animals/cat.png");
    touch(root, "images/animals/dog.jpg");
    touch(root, "images/animals/polar_bear.webp");
    touch(root, "images/animals/cover.jpg");
    touch(root, "audio/animals/cat.mp3");
    touch(root, "audio/animals/polar_bear.ogg");
    touch(root, "audio/animals/polar_bear.wav");
    touch(root, "images/fruits/apple.svg");
    fs::write(root.join("navigation.json"), NAVIGATION).unwrap();

    temp_dir
}

mod manifest_pipeline_tests {
    use super::*;

    #[tokio::test]
    async fn test_build_then_resolve() {
        let temp_dir = sample_tree();
        let state = state_for(temp_dir.path());

        let summary = state.manifest_builder().build_all().await.unwrap();
        assert!(summary.errors.is_empty());
        assert_eq!(summary.manifests.len(), 2);

        let raw = fs::read_to_string(temp_dir.path().join("images/animals/manifest.json")).unwrap();
        let manifest = CategoryManifest::parse(&raw).unwrap();
        assert_eq!(manifest.images, vec!["cat.png", "dog.jpg", "polar_bear.webp"]);
        assert_eq!(manifest.audio_matches, 2);
        assert_eq!(manifest.items[1].audio.as_deref(), Some("polar_bear.wav"));

        let categories = state.content.get_available_categories().await;
        assert_eq!(categories, vec!["animals", "fruits"]);

        let items = state.content.scan_category("animals").await;
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].image_path, "/content/images/animals/cat.png");
        assert_eq!(items[0].audio_path.as_deref(), Some("/content/audio/animals/cat.mp3"));
        assert_eq!(items[1].audio_path, None);
        assert_eq!(items[2].display_name, "Polar Bear");

        let with_audio = items.iter().filter(|item| item.audio_path.is_some()).count();
        assert_eq!(with_audio, manifest.audio_matches);
    }

    #[tokio::test]
    async fn test_cache_hides_changes_until_cleared() {
        let temp_dir = sample_tree();
        let state = state_for(temp_dir.path());
        state.manifest_builder().build_all().await.unwrap();

        let before = state.content.scan_category("fruits").await;
        assert_eq!(before[0].audio_path, None);

        touch(temp_dir.path(), "audio/fruits/apple.m4a");
        assert_eq!(state.content.scan_category("fruits").await, before);

        state.content.clear_cache(Some("fruits")).await;
        let after = state.content.scan_category("fruits").await;
        assert_eq!(after[0].audio_path.as_deref(), Some("/content/audio/fruits/apple.m4a"));
    }

    #[tokio::test]
    async fn test_missing_index_falls_back_to_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let state = state_for(temp_dir.path());

        let categories = state.content.get_available_categories().await;
        assert_eq!(categories, state.config.content.fallback_categories);
        assert!(state.content.scan_category("animals").await.is_empty());
    }
}

mod navigation_tests {
    use super::*;

    #[tokio::test]
    async fn test_routes_and_breadcrumbs_from_file() {
        let temp_dir = sample_tree();
        let state = state_for(temp_dir.path());
        assert_eq!(state.navigation.state(), LoadState::Unloaded);

        let routes = state.navigation.generate_routes().await;
        assert_eq!(state.navigation.state(), LoadState::Ready);

        assert_eq!(routes.entries().first().unwrap().path, "/");
        assert!(routes.entries().last().unwrap().is_catch_all());
        assert_eq!(routes.resolve("/skills/animals").unwrap().view, ViewKind::SkillCategory);
        assert_eq!(routes.resolve("/stories/three-bears").unwrap().view, ViewKind::Story);
        assert_eq!(routes.resolve("/parent-guide").unwrap().view, ViewKind::ParentGuide);
        assert_eq!(routes.resolve("/missing").unwrap().view, ViewKind::NotFound);

        let trail: Vec<String> = state
            .navigation
            .get_breadcrumbs("/skills/animals")
            .await
            .into_iter()
            .map(|node| node.id)
            .collect();
        assert_eq!(trail, vec!["skills", "animals"]);

        let animals = state.navigation.find_by_id("animals").await.unwrap();
        assert_eq!(animals.cover_image.as_deref(), Some("/content/images/animals/cover.jpg"));
        assert_eq!(state.navigation.get_navigation_structure().await.len(), 3);
    }

    #[tokio::test]
    async fn test_missing_navigation_degrades_to_no_routes() {
        let temp_dir = TempDir::new().unwrap();
        let state = state_for(temp_dir.path());

        let routes = state.navigation.generate_routes().await;
        assert_eq!(routes.len(), 2);
        assert!(state.navigation.get_breadcrumbs("/skills").await.is_empty());
    }
}
