use std::collections::HashSet;

use super::{AppConfig, ContentConfig};
use crate::error::{AppError, Result};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Configuration validator for ensuring configuration integrity
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the entire application configuration
    pub fn validate(config: &AppConfig) -> Result<()> {
        Self::validate_content_config(&config.content)?;
        Self::validate_logging_config(config)?;
        Self::validate_watcher_config(config)?;
        Ok(())
    }

    fn validate_content_config(content: &ContentConfig) -> Result<()> {
        if content.root.trim().is_empty() {
            return Err(invalid("Content root cannot be empty"));
        }

        let directories = [
            ("images_dir", &content.images_dir),
            ("audio_dir", &content.audio_dir),
        ];
        for (field, value) in directories {
            Self::validate_segment(field, value)?;
        }

        let files = [
            ("manifest_file", &content.manifest_file),
            ("index_file", &content.index_file),
            ("navigation_file", &content.navigation_file),
            ("cover_file", &content.cover_file),
        ];
        for (field, value) in files {
            Self::validate_segment(field, value)?;
            if value.contains('/') {
                return Err(invalid(format!("{} must be a file name, got '{}'", field, value)));
            }
        }

        if content.images_dir == content.audio_dir {
            return Err(invalid("images_dir and audio_dir cannot be the same directory"));
        }

        Self::validate_extensions("image_extensions", &content.image_extensions)?;
        Self::validate_extensions("audio_extensions", &content.audio_extensions)?;

        Ok(())
    }

    fn validate_segment(field: &str, value: &str) -> Result<()> {
        if value.trim().is_empty() {
            return Err(invalid(format!("{} cannot be empty", field)));
        }
        if value.split('/').any(|segment| segment == "..") {
            return Err(invalid(format!("{} cannot contain '..': {}", field, value)));
        }
        Ok(())
    }

    fn validate_extensions(field: &str, extensions: &[String]) -> Result<()> {
        if extensions.is_empty() {
            return Err(invalid(format!("At least one entry must be configured in {}", field)));
        }

        let mut seen = HashSet::new();
        for extension in extensions {
            if !extension.starts_with('.') || extension.len() < 2 {
                return Err(invalid(format!(
                    "Extension '{}' in {} must start with a dot",
                    extension, field
                )));
            }
            if !seen.insert(extension.to_lowercase()) {
                return Err(invalid(format!("Duplicate extension '{}' in {}", extension, field)));
            }
        }

        Ok(())
    }

    fn validate_logging_config(config: &AppConfig) -> Result<()> {
        let level = config.logging.level.to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(invalid(format!(
                "Unknown log level '{}', expected one of {:?}",
                config.logging.level, LOG_LEVELS
            )));
        }
        Ok(())
    }

    fn validate_watcher_config(config: &AppConfig) -> Result<()> {
        if config.watcher.debounce_ms == 0 {
            return Err(invalid("Watcher debounce must be greater than 0 milliseconds"));
        }
        Ok(())
    }
}

fn invalid(reason: impl Into<String>) -> AppError {
    AppError::Configuration(reason.into())
}
