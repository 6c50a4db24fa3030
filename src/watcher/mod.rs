use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use notify_debouncer_full::{new_debouncer, DebounceEventResult, DebouncedEvent, Debouncer, FileIdMap};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::config::{ContentConfig, WatcherConfig};
use crate::error::{AppError, Result};
use crate::logging::log_build_summary;
use crate::manifest::ManifestBuilder;

const CHANNEL_CAPACITY: usize = 16;

/// A debounced batch of changes under the content root
#[derive(Debug, Clone)]
pub struct ContentChange {
    pub paths: Vec<PathBuf>,
}

/// Watches the content tree and rebuilds manifests when it changes.
pub struct ContentWatcher {
    root: PathBuf,
    content: ContentConfig,
    debounce: Duration,
}

impl ContentWatcher {
    pub fn new(content: ContentConfig, config: &WatcherConfig) -> Self {
        Self {
            root: content.root_path(),
            debounce: Duration::from_millis(config.debounce_ms),
            content,
        }
    }

    /// Whether a change at `path` can affect generated output.
    ///
    /// Generated files and hidden files are ignored, otherwise every
    /// manifest write would trigger another rebuild.
    pub fn is_relevant(content: &ContentConfig, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            return false;
        };
        !name.starts_with('.') && !content.is_generated_file(name)
    }

    fn relevant_paths(content: &ContentConfig, events: &[DebouncedEvent]) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = events
            .iter()
            .filter(|event| !matches!(event.event.kind, EventKind::Access(_)))
            .flat_map(|event| event.paths.iter())
            .filter(|path| Self::is_relevant(content, path))
            .cloned()
            .collect();
        paths.sort();
        paths.dedup();
        paths
    }

    /// Start watching the content root recursively.
    ///
    /// Watching stops when the returned debouncer is dropped.
    pub fn start(&self) -> Result<(Debouncer<RecommendedWatcher, FileIdMap>, mpsc::Receiver<ContentChange>)> {
        if !self.root.is_dir() {
            return Err(AppError::MissingResource {
                path: self.root.display().to_string(),
            });
        }

        let (sender, receiver) = mpsc::channel(CHANNEL_CAPACITY);
        let content = self.content.clone();

        let mut debouncer = new_debouncer(self.debounce, None, move |result: DebounceEventResult| {
            match result {
                Ok(events) => {
                    let paths = Self::relevant_paths(&content, &events);
                    if paths.is_empty() {
                        debug!("Ignoring {} events on generated or hidden files", events.len());
                        return;
                    }
                    debug!("Content change detected: {:?}", paths);
                    if let Err(e) = sender.try_send(ContentChange { paths }) {
                        debug!("Rebuild already queued: {}", e);
                    }
                }
                Err(errors) => {
                    for error in errors {
                        error!("File watcher error: {:?}", error);
                    }
                }
            }
        })?;

        debouncer.watcher().watch(&self.root, RecursiveMode::Recursive)?;
        info!(
            "Watching {} for content changes ({}ms debounce)",
            self.root.display(),
            self.debounce.as_millis()
        );

        Ok((debouncer, receiver))
    }

    /// Rebuild every manifest after each debounced change until `shutdown` fires.
    pub async fn run(&self, builder: &ManifestBuilder, shutdown: CancellationToken) -> Result<()> {
        let (_debouncer, mut changes) = self.start()?;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Content watcher stopped");
                    return Ok(());
                }
                change = changes.recv() => {
                    let Some(change) = change else {
                        return Ok(());
                    };

                    let mut paths = change.paths;
                    while let Ok(more) = changes.try_recv() {
                        paths.extend(more.paths);
                    }

                    info!("Content changed ({} paths), rebuilding manifests", paths.len());
                    match builder.build_all().await {
                        Ok(summary) => log_build_summary(&summary),
                        Err(e) => error!("Manifest rebuild failed: {}", e),
                    }
                }
            }
        }
    }
}
