use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use super::{validate_path, ContentStore, StoreEntry, StoreError};

/// Content store over a directory on the local file system.
pub struct LocalContentStore {
    root: PathBuf,
}

impl LocalContentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a content path onto the file system after validating it.
    fn resolve(&self, path: &str) -> Result<PathBuf, StoreError> {
        validate_path(path)?;

        let mut resolved = self.root.clone();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            resolved.push(segment);
        }
        Ok(resolved)
    }

    fn map_io(path: &str, err: std::io::Error) -> StoreError {
        if err.kind() == std::io::ErrorKind::NotFound {
            StoreError::NotFound { path: path.to_string() }
        } else {
            StoreError::Io(err)
        }
    }
}

#[async_trait::async_trait]
impl ContentStore for LocalContentStore {
    async fn fetch(&self, path: &str) -> Result<String, StoreError> {
        let full = self.resolve(path)?;
        fs::read_to_string(&full).await.map_err(|e| Self::map_io(path, e))
    }

    async fn probe(&self, path: &str) -> bool {
        match self.resolve(path) {
            Ok(full) => fs::metadata(&full).await.is_ok(),
            Err(e) => {
                debug!("Rejected probe for {}: {}", path, e);
                false
            }
        }
    }

    async fn list(&self, path: &str) -> Result<Vec<StoreEntry>, StoreError> {
        let full = self.resolve(path)?;
        let mut entries = fs::read_dir(&full).await.map_err(|e| Self::map_io(path, e))?;

        let mut listed = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            let is_dir = entry.file_type().await?.is_dir();
            listed.push(StoreEntry { name, is_dir });
        }

        Ok(listed)
    }

    fn supports_listing(&self) -> bool {
        true
    }

    async fn create_dir_all(&self, path: &str) -> Result<(), StoreError> {
        let full = self.resolve(path)?;
        fs::create_dir_all(&full).await?;
        Ok(())
    }

    async fn write(&self, path: &str, contents: &str) -> Result<(), StoreError> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&full, contents).await?;
        Ok(())
    }
}
