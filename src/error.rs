use thiserror::Error;

use crate::store::StoreError;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    /// A directory, file or manifest is absent. Always recoverable.
    #[error("Missing resource: {path}")]
    MissingResource { path: String },

    /// A resource that was expected to exist could not be loaded.
    #[error("Failed to load {path}: {reason}")]
    LoadFailure { path: String, reason: String },

    /// Malformed manifest shape, duplicate navigation id, and similar.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Content store error: {0}")]
    Store(#[from] StoreError),

    #[error("File watcher error: {0}")]
    Watcher(#[from] notify::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O Error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Whether callers can degrade to default data instead of failing.
    pub fn is_recoverable(&self) -> bool {
        match self {
            AppError::MissingResource { .. } => true,
            AppError::LoadFailure { .. } => true,
            AppError::InvariantViolation(_) => false,
            AppError::Configuration(_) => false,
            AppError::Store(e) => e.is_not_found(),
            AppError::Watcher(_) => false,
            AppError::Json(_) => false,
            AppError::Io(_) => true,
        }
    }
}
