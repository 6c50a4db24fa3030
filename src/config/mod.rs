use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};
use crate::media::{AUDIO_EXTENSIONS, COVER_FILE, IMAGE_EXTENSIONS};
use crate::store::join;

pub mod validation;

use validation::ConfigValidator;

/// Categories offered when no category index has been deployed.
pub const DEFAULT_CATEGORIES: &[&str] = &[
    "animals",
    "fruits",
    "vegetables",
    "colors",
    "shapes",
    "numbers",
    "body-parts",
    "clothing",
    "transportation",
    "careers",
    "household-items",
    "school-supplies",
    "insects",
];

/// Main application configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub content: ContentConfig,
    pub logging: LoggingConfig,
    pub watcher: WatcherConfig,
}

/// Where content lives and how it is laid out
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    pub root: String,
    pub public_prefix: String,
    pub images_dir: String,
    pub audio_dir: String,
    pub manifest_file: String,
    pub index_file: String,
    pub navigation_file: String,
    pub cover_file: String,
    pub image_extensions: Vec<String>,
    /// Ordered; the first existing variant wins when pairing audio.
    pub audio_extensions: Vec<String>,
    pub fallback_categories: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    pub debounce_ms: u64,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("public")
                .join("content")
                .to_string_lossy()
                .to_string(),
            public_prefix: "/content".to_string(),
            images_dir: "images".to_string(),
            audio_dir: "audio".to_string(),
            manifest_file: "manifest.json".to_string(),
            index_file: "categories.json".to_string(),
            navigation_file: "navigation.json".to_string(),
            cover_file: COVER_FILE.to_string(),
            image_extensions: IMAGE_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            audio_extensions: AUDIO_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            fallback_categories: DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self { debounce_ms: 500 }
    }
}

impl ContentConfig {
    pub fn root_path(&self) -> PathBuf {
        PathBuf::from(&self.root)
    }

    pub fn category_images_dir(&self, category: &str) -> String {
        join(&[&self.images_dir, category])
    }

    pub fn category_audio_dir(&self, category: &str) -> String {
        join(&[&self.audio_dir, category])
    }

    /// Manifests sit next to the images they describe.
    pub fn manifest_path(&self, category: &str) -> String {
        join(&[&self.images_dir, category, &self.manifest_file])
    }

    /// Public URL for a content path, e.g. `/content/images/animals/cat.png`.
    pub fn public_url(&self, content_path: &str) -> String {
        let prefix = self.public_prefix.trim_end_matches('/');
        format!("{}/{}", prefix, content_path.trim_start_matches('/'))
    }

    /// File names the builder writes itself.
    pub fn is_generated_file(&self, file_name: &str) -> bool {
        file_name == self.manifest_file
            || file_name == self.index_file
            || file_name == self.navigation_file
    }
}

impl AppConfig {
    /// Load configuration from file or create with defaults
    pub fn load_or_create<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_path = config_path.as_ref();

        if config_path.exists() {
            Self::load_from_file(config_path)
        } else {
            let default_config = Self::default();
            default_config.save_to_file(config_path)?;
            tracing::info!("Created default configuration file at: {}", config_path.display());
            Ok(default_config)
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_path = config_path.as_ref();
        let content = std::fs::read_to_string(config_path).map_err(|e| {
            AppError::Configuration(format!(
                "Failed to read config file {}: {}",
                config_path.display(),
                e
            ))
        })?;

        let config: AppConfig = toml::from_str(&content).map_err(|e| {
            AppError::Configuration(format!(
                "Failed to parse config file {}: {}",
                config_path.display(),
                e
            ))
        })?;

        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, config_path: P) -> Result<()> {
        let config_path = config_path.as_ref();

        if let Some(parent) = config_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let body = toml::to_string_pretty(self).map_err(|e| {
            AppError::Configuration(format!("Failed to serialize configuration to TOML: {}", e))
        })?;

        let content = format!(
            "# SoFlu content configuration\n\
             # audio_extensions is ordered: the first existing variant is paired with an image.\n\n{}",
            body
        );

        std::fs::write(config_path, content)?;
        Ok(())
    }

    /// Per-user configuration file location
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("soflu")
            .join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_creation() {
        let config = AppConfig::default();

        assert_eq!(config.content.public_prefix, "/content");
        assert_eq!(config.content.audio_extensions[0], ".mp3");
        assert_eq!(config.content.cover_file, "cover.jpg");
        assert_eq!(config.content.fallback_categories.len(), DEFAULT_CATEGORIES.len());
        assert!(ConfigValidator::validate(&config).is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();

        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[content]"));
        assert!(toml_str.contains("[logging]"));
        assert!(toml_str.contains("[watcher]"));

        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.content.audio_extensions, config.content.audio_extensions);
        assert_eq!(parsed.watcher.debounce_ms, config.watcher.debounce_ms);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let parsed: AppConfig = toml::from_str("[content]\nroot = \"/srv/soflu\"\n").unwrap();

        assert_eq!(parsed.content.root, "/srv/soflu");
        assert_eq!(parsed.content.images_dir, "images");
        assert_eq!(parsed.logging.level, "info");
    }

    #[test]
    fn test_config_file_operations() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.toml");

        let created = AppConfig::load_or_create(&config_path).unwrap();
        assert!(config_path.exists());

        let loaded = AppConfig::load_from_file(&config_path).unwrap();
        assert_eq!(created.content.root, loaded.content.root);
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        std::fs::write(&config_path, "[content]\naudio_extensions = [\"mp3\"]\n").unwrap();

        let err = AppConfig::load_from_file(&config_path).unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
    }

    #[test]
    fn test_layout_paths() {
        let content = ContentConfig::default();

        assert_eq!(content.manifest_path("animals"), "images/animals/manifest.json");
        assert_eq!(content.category_audio_dir("animals"), "audio/animals");
        assert_eq!(content.public_url("images/animals/cat.png"), "/content/images/animals/cat.png");
        assert!(content.is_generated_file("categories.json"));
        assert!(!content.is_generated_file("cat.png"));
    }
}
