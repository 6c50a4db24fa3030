use std::path::Path;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{AppConfig, ContentConfig};
use crate::error::{AppError, Result};
use crate::manifest::BuildSummary;

/// Initialize logging.
///
/// `RUST_LOG` wins over `log_level`, which wins over the `debug` flag.
pub fn init_logging_with_options(log_level: Option<&str>, debug: bool) -> Result<()> {
    let default_level = if debug { "debug" } else { "info" };
    let level = log_level.unwrap_or(default_level);

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| AppError::Configuration(format!("Invalid log level: {}", e)))?;

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_file(debug)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| AppError::Configuration(format!("Logging already initialized: {}", e)))?;

    debug!("Logging initialized with level: {}", level);
    Ok(())
}

/// Log the outcome of a manifest build
pub fn log_build_summary(summary: &BuildSummary) {
    info!("=== Manifest Build ===");
    info!("{}", summary.summary());

    for manifest in &summary.manifests {
        let unmatched = manifest.images.len().saturating_sub(manifest.audio_matches);
        if unmatched > 0 {
            info!(
                "  - {}: {} images, {} with audio ({} without)",
                manifest.category,
                manifest.images.len(),
                manifest.audio_matches,
                unmatched
            );
        } else {
            info!("  - {}: {} images, all with audio", manifest.category, manifest.images.len());
        }
    }

    if let Some(index) = &summary.index {
        info!("Category index lists {} categories", index.categories.len());
    } else {
        warn!("No category index was written");
    }

    for failure in &summary.errors {
        error!("  ! {}: {}", failure.category, failure.error);
    }
}

/// Log where content is read from and which pieces are present
pub fn log_content_layout(content: &ContentConfig) {
    let root = content.root_path();
    info!("=== Content Layout ===");
    info!("Content root: {}", root.display());

    if !root.is_dir() {
        warn!("Content root does not exist - run a scan to create it");
        return;
    }

    for (label, relative) in [
        ("Images", content.images_dir.as_str()),
        ("Audio", content.audio_dir.as_str()),
        ("Category index", content.index_file.as_str()),
        ("Navigation", content.navigation_file.as_str()),
    ] {
        let path = root.join(relative);
        let status = if path.exists() { "present" } else { "missing" };
        info!("  {}: {} [{}]", label, path.display(), status);
    }

    debug!("Image extensions: {}", content.image_extensions.join(" "));
    debug!("Audio extensions (match order): {}", content.audio_extensions.join(" "));
}

/// Log which configuration file is in effect
pub fn log_configuration_status(config_path: Option<&Path>, config: &AppConfig) {
    info!("=== Configuration Status ===");

    match config_path {
        Some(path) if path.exists() => info!("Configuration file: {}", path.display()),
        Some(path) => warn!("Configuration file not found - using defaults: {}", path.display()),
        None => info!("No configuration file specified - using built-in defaults"),
    }

    info!("Log level: {}", config.logging.level);
    info!("Watcher debounce: {}ms", config.watcher.debounce_ms);
    debug!("Fallback categories: {}", config.content.fallback_categories.join(", "));
}
