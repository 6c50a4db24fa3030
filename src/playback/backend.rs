use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast;

/// Notification raised by a media handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSignal {
    /// Enough data is buffered to start playing.
    Ready,
    Ended,
    Error(String),
}

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Failed to load {path}: {reason}")]
    Load { path: String, reason: String },

    #[error("Playback failed: {0}")]
    Playback(String),
}

/// A decodable media resource supplied by the host platform.
#[async_trait]
pub trait MediaHandle: Send + Sync {
    fn path(&self) -> &str;

    /// Whether the `Ready` signal has already fired.
    fn is_ready(&self) -> bool;

    /// Reason of the last load or decode error, if one was raised.
    fn failure(&self) -> Option<String>;

    /// Subscribe to ready/ended/error notifications.
    fn signals(&self) -> broadcast::Receiver<MediaSignal>;

    async fn play(&self) -> Result<(), MediaError>;

    fn pause(&self);

    fn seek(&self, position: Duration);

    fn set_volume(&self, volume: f32);
}

/// Opens media handles by path.
#[async_trait]
pub trait MediaBackend: Send + Sync {
    async fn open(&self, path: &str) -> Result<Arc<dyn MediaHandle>, MediaError>;
}
