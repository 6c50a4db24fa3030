use thiserror::Error;

pub mod local;

pub use local::LocalContentStore;

/// Longest content path accepted by [`validate_path`].
const MAX_PATH_LEN: usize = 4096;

/// Storage collaborator for content trees.
///
/// Paths are `/`-separated and relative to the content root, e.g.
/// `images/animals/manifest.json`. The builder needs every capability;
/// the runtime resolver only needs `fetch` and `probe`, so stores backed
/// by something like an HTTP origin can leave listing and writing
/// unsupported.
#[async_trait::async_trait]
pub trait ContentStore: Send + Sync {
    /// Read a text resource.
    async fn fetch(&self, path: &str) -> Result<String, StoreError>;

    /// Check whether a resource exists. Absence is not an error.
    async fn probe(&self, path: &str) -> bool;

    /// List the direct children of a directory.
    async fn list(&self, path: &str) -> Result<Vec<StoreEntry>, StoreError> {
        let _ = path;
        Err(StoreError::Unsupported { operation: "list" })
    }

    /// Whether `list` is implemented by this store
    fn supports_listing(&self) -> bool {
        false
    }

    async fn create_dir_all(&self, path: &str) -> Result<(), StoreError> {
        let _ = path;
        Err(StoreError::Unsupported { operation: "create_dir_all" })
    }

    /// Write (overwrite) a text resource, creating parent directories.
    async fn write(&self, path: &str, contents: &str) -> Result<(), StoreError> {
        let _ = (path, contents);
        Err(StoreError::Unsupported { operation: "write" })
    }

    /// Warm-up hint for a resource that is about to be displayed.
    async fn prefetch(&self, path: &str) {
        let _ = self.probe(path).await;
    }
}

/// One entry of a directory listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEntry {
    pub name: String,
    pub is_dir: bool,
}

impl StoreEntry {
    pub fn file(name: impl Into<String>) -> Self {
        Self { name: name.into(), is_dir: false }
    }

    pub fn dir(name: impl Into<String>) -> Self {
        Self { name: name.into(), is_dir: true }
    }

    /// Dotfile-style entries are hidden from category and image enumeration.
    pub fn is_hidden(&self) -> bool {
        self.name.starts_with('.')
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Path not found: {path}")]
    NotFound { path: String },

    #[error("Operation not supported by this content store: {operation}")]
    Unsupported { operation: &'static str },

    #[error("Invalid path: {path} - {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        match self {
            StoreError::NotFound { .. } => true,
            StoreError::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

/// Reject content paths that could escape the content root.
pub fn validate_path(path: &str) -> Result<(), StoreError> {
    if path.contains('\0') {
        return Err(StoreError::InvalidPath {
            path: path.replace('\0', "\\0"),
            reason: "Path contains null bytes".to_string(),
        });
    }

    if path.len() > MAX_PATH_LEN {
        return Err(StoreError::InvalidPath {
            path: path.to_string(),
            reason: "Path is too long".to_string(),
        });
    }

    if path.split(|c| c == '/' || c == '\\').any(|segment| segment == "..") {
        return Err(StoreError::InvalidPath {
            path: path.to_string(),
            reason: "Path contains directory traversal".to_string(),
        });
    }

    Ok(())
}

/// Join content path segments with `/`, skipping empty ones.
pub fn join(segments: &[&str]) -> String {
    segments
        .iter()
        .map(|s| s.trim_matches('/'))
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}
