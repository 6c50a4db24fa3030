//! Single-stream audio playback.
//!
//! [`PlaybackArbiter`] owns every media handle it opened and guarantees that
//! at most one of them is playing. Starting a clip first stops and rewinds
//! whatever was playing, before the new clip begins loading.

use futures_util::future::join_all;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Weak};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub mod backend;

pub use backend::{MediaBackend, MediaError, MediaHandle, MediaSignal};

const EVENT_CAPACITY: usize = 64;
const DEFAULT_VOLUME: f32 = 1.0;

/// Lifecycle of a cached handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HandleState {
    Idle,
    Loading,
    Playing,
    Paused,
    Ended,
    Errored,
}

/// Broadcast on every observable change
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    StateChanged { path: String, state: HandleState },
    VolumeChanged(f32),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackStatus {
    pub is_playing: bool,
    pub current_path: Option<String>,
    pub volume: f32,
}

/// Result of a `play` call that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    Started,
    /// A later `play` or `stop` took over before this clip was ready.
    Superseded,
}

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("No media path given")]
    NoPath,

    #[error("Failed to load {path}: {reason}")]
    LoadFailed { path: String, reason: String },

    #[error("Failed to start {path}: {reason}")]
    StartFailed { path: String, reason: String },
}

struct CachedHandle {
    handle: Arc<dyn MediaHandle>,
    state: HandleState,
}

struct ArbiterInner {
    handles: HashMap<String, CachedHandle>,
    /// Path of the clip that is loading, playing or paused.
    active: Option<String>,
    /// Bumped on every play/stop; completions from older generations are stale.
    generation: u64,
    /// Cancels the ready-wait and signal watcher of the active clip.
    pending: CancellationToken,
    volume: f32,
    events: broadcast::Sender<PlaybackEvent>,
}

impl ArbiterInner {
    fn transition(&mut self, path: &str, state: HandleState) {
        if let Some(cached) = self.handles.get_mut(path) {
            if cached.state == state {
                return;
            }
            debug!("{}: {:?} -> {:?}", path, cached.state, state);
            cached.state = state;
        }
        let _ = self.events.send(PlaybackEvent::StateChanged {
            path: path.to_string(),
            state,
        });
    }

    /// Stop and rewind the active clip and invalidate anything in flight.
    fn stop_active(&mut self) {
        self.generation += 1;
        self.pending.cancel();
        self.pending = CancellationToken::new();

        let Some(path) = self.active.take() else {
            return;
        };
        if let Some(cached) = self.handles.get(&path) {
            cached.handle.pause();
            cached.handle.seek(Duration::ZERO);
            self.transition(&path, HandleState::Idle);
        }
    }

    fn is_current(&self, path: &str, generation: u64) -> bool {
        self.generation == generation && self.active.as_deref() == Some(path)
    }

    /// Record a broken active handle and drop it so a later play reopens it.
    ///
    /// Returns false without touching anything when `generation` is stale.
    fn fail(&mut self, path: &str, generation: u64) -> bool {
        if !self.is_current(path, generation) {
            return false;
        }
        self.active = None;
        self.transition(path, HandleState::Errored);
        self.handles.remove(path);
        true
    }

    /// Drop a preloaded handle that failed before anyone played it.
    fn evict_failed_preload(&mut self, path: &str, handle: &Weak<dyn MediaHandle>, reason: &str) {
        if self.active.as_deref() == Some(path) {
            return;
        }
        let same = self
            .handles
            .get(path)
            .map_or(false, |cached| Weak::ptr_eq(handle, &Arc::downgrade(&cached.handle)));
        if !same {
            return;
        }

        warn!("Preloaded {} failed: {}", path, reason);
        self.transition(path, HandleState::Errored);
        self.handles.remove(path);
    }
}

/// Process-wide audio arbiter.
///
/// Create one per process and share it; every instance keeps its own handle
/// cache and active slot.
pub struct PlaybackArbiter {
    backend: Arc<dyn MediaBackend>,
    inner: Arc<Mutex<ArbiterInner>>,
    events: broadcast::Sender<PlaybackEvent>,
}

impl PlaybackArbiter {
    pub fn new(backend: Arc<dyn MediaBackend>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let inner = ArbiterInner {
            handles: HashMap::new(),
            active: None,
            generation: 0,
            pending: CancellationToken::new(),
            volume: DEFAULT_VOLUME,
            events: events.clone(),
        };

        Self {
            backend,
            inner: Arc::new(Mutex::new(inner)),
            events,
        }
    }

    /// Subscribe to state transitions instead of polling [`get_status`](Self::get_status).
    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.events.subscribe()
    }

    /// Play `path`, stopping whatever was playing first.
    ///
    /// Resolves once the clip has actually started. Load failures and start
    /// failures are reported as different errors.
    pub async fn play(&self, path: &str) -> Result<PlayOutcome, PlaybackError> {
        if path.is_empty() {
            return Err(PlaybackError::NoPath);
        }

        let (generation, token, cached) = {
            let mut inner = self.inner.lock().await;
            inner.stop_active();
            inner.active = Some(path.to_string());

            let cached = inner.handles.get(path).map(|c| c.handle.clone());
            if cached.is_some() {
                inner.transition(path, HandleState::Loading);
            }
            (inner.generation, inner.pending.clone(), cached)
        };

        let handle = match cached {
            Some(handle) => handle,
            None => match self.open(path, generation).await? {
                Some(handle) => handle,
                None => return Ok(PlayOutcome::Superseded),
            },
        };

        // Subscribe before checking readiness so a Ready raised in between is not lost.
        let mut signals = handle.signals();
        // A cached handle may have failed while nobody was listening.
        if let Some(reason) = handle.failure() {
            return self.reject_load(path, generation, reason).await;
        }
        if !handle.is_ready() {
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => return Ok(PlayOutcome::Superseded),
                    signal = signals.recv() => match signal {
                        Ok(MediaSignal::Ready) => break,
                        Ok(MediaSignal::Error(reason)) => {
                            return self.reject_load(path, generation, reason).await;
                        }
                        Ok(MediaSignal::Ended) | Err(RecvError::Lagged(_)) => {
                            if let Some(reason) = handle.failure() {
                                return self.reject_load(path, generation, reason).await;
                            }
                            if handle.is_ready() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => {
                            let reason = "media handle closed before it was ready".to_string();
                            return self.reject_load(path, generation, reason).await;
                        }
                    }
                }
            }
        }

        let mut inner = self.inner.lock().await;
        if !inner.is_current(path, generation) {
            return Ok(PlayOutcome::Superseded);
        }

        if let Err(e) = handle.play().await {
            warn!("Failed to start {}: {}", path, e);
            inner.fail(path, generation);
            return Err(PlaybackError::StartFailed {
                path: path.to_string(),
                reason: e.to_string(),
            });
        }

        inner.transition(path, HandleState::Playing);
        self.watch_signals(path.to_string(), generation, signals, token);
        info!("Playing {}", path);

        Ok(PlayOutcome::Started)
    }

    /// Evict a handle that failed to load, unless a later play already took over.
    async fn reject_load(&self, path: &str, generation: u64, reason: String) -> Result<PlayOutcome, PlaybackError> {
        if !self.inner.lock().await.fail(path, generation) {
            return Ok(PlayOutcome::Superseded);
        }
        warn!("Failed to load {}: {}", path, reason);
        Err(PlaybackError::LoadFailed {
            path: path.to_string(),
            reason,
        })
    }

    /// Open a fresh handle for the active clip. `None` when superseded meanwhile.
    async fn open(&self, path: &str, generation: u64) -> Result<Option<Arc<dyn MediaHandle>>, PlaybackError> {
        let opened = self.backend.open(path).await;

        let mut inner = self.inner.lock().await;
        let current = inner.is_current(path, generation);

        match opened {
            Ok(handle) => {
                handle.set_volume(inner.volume);
                let handle = inner
                    .handles
                    .entry(path.to_string())
                    .or_insert_with(|| CachedHandle { handle, state: HandleState::Idle })
                    .handle
                    .clone();
                if !current {
                    return Ok(None);
                }
                inner.transition(path, HandleState::Loading);
                Ok(Some(handle))
            }
            Err(e) if current => {
                warn!("Failed to load {}: {}", path, e);
                inner.active = None;
                let _ = inner.events.send(PlaybackEvent::StateChanged {
                    path: path.to_string(),
                    state: HandleState::Errored,
                });
                Err(PlaybackError::LoadFailed {
                    path: path.to_string(),
                    reason: e.to_string(),
                })
            }
            Err(e) => {
                debug!("Ignoring load failure of superseded {}: {}", path, e);
                Ok(None)
            }
        }
    }

    /// Follow ended/error signals of the clip that just started.
    fn watch_signals(
        &self,
        path: String,
        generation: u64,
        mut signals: broadcast::Receiver<MediaSignal>,
        token: CancellationToken,
    ) {
        let inner = Arc::clone(&self.inner);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    signal = signals.recv() => match signal {
                        Ok(MediaSignal::Ended) => {
                            let mut inner = inner.lock().await;
                            if inner.is_current(&path, generation) {
                                inner.active = None;
                                inner.transition(&path, HandleState::Ended);
                            }
                            break;
                        }
                        Ok(MediaSignal::Error(reason)) => {
                            warn!("Playback error on {}: {}", path, reason);
                            inner.lock().await.fail(&path, generation);
                            break;
                        }
                        Ok(MediaSignal::Ready) | Err(RecvError::Lagged(_)) => continue,
                        Err(RecvError::Closed) => break,
                    }
                }
            }
        });
    }

    /// Stop the active clip and rewind it. No-op when nothing is active.
    pub async fn stop(&self) {
        self.inner.lock().await.stop_active();
    }

    pub async fn pause(&self) {
        let mut inner = self.inner.lock().await;
        let Some(path) = inner.active.clone() else {
            return;
        };
        let Some(cached) = inner.handles.get(&path) else {
            return;
        };
        if cached.state == HandleState::Playing {
            cached.handle.pause();
            inner.transition(&path, HandleState::Paused);
        }
    }

    pub async fn resume(&self) -> Result<(), PlaybackError> {
        let mut inner = self.inner.lock().await;
        let Some(path) = inner.active.clone() else {
            return Ok(());
        };
        let Some(handle) = inner
            .handles
            .get(&path)
            .filter(|cached| cached.state == HandleState::Paused)
            .map(|cached| cached.handle.clone())
        else {
            return Ok(());
        };

        match handle.play().await {
            Ok(()) => {
                inner.transition(&path, HandleState::Playing);
                Ok(())
            }
            Err(e) => {
                let generation = inner.generation;
                inner.fail(&path, generation);
                Err(PlaybackError::StartFailed {
                    path,
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Clamp `level` to `[0, 1]` and apply it to every cached handle.
    ///
    /// Handles opened later pick up the same level. NaN is ignored.
    pub async fn set_volume(&self, level: f32) -> f32 {
        let mut inner = self.inner.lock().await;
        if level.is_nan() {
            return inner.volume;
        }

        let volume = level.clamp(0.0, 1.0);
        inner.volume = volume;
        for cached in inner.handles.values() {
            cached.handle.set_volume(volume);
        }
        let _ = inner.events.send(PlaybackEvent::VolumeChanged(volume));

        volume
    }

    /// Warm the cache for `paths`. Individual failures are logged and skipped.
    ///
    /// Returns how many handles were newly opened.
    pub async fn preload<I, S>(&self, paths: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let wanted: Vec<String> = {
            let inner = self.inner.lock().await;
            let mut seen = HashSet::new();
            paths
                .into_iter()
                .map(|path| path.as_ref().to_string())
                .filter(|path| !path.is_empty() && !inner.handles.contains_key(path))
                .filter(|path| seen.insert(path.clone()))
                .collect()
        };

        if wanted.is_empty() {
            return 0;
        }

        let results = join_all(wanted.iter().map(|path| self.backend.open(path))).await;

        let mut inner = self.inner.lock().await;
        let volume = inner.volume;
        let mut loaded = 0;
        for (path, result) in wanted.into_iter().zip(results) {
            match result {
                Ok(handle) => {
                    if inner.handles.contains_key(&path) {
                        continue;
                    }
                    handle.set_volume(volume);
                    self.watch_preloaded(path.clone(), &handle);
                    inner.handles.insert(path, CachedHandle { handle, state: HandleState::Idle });
                    loaded += 1;
                }
                Err(e) => warn!("Failed to preload {}: {}", path, e),
            }
        }

        debug!("Preloaded {} media handles", loaded);
        loaded
    }

    /// Wait until a preloaded handle is ready or failed, and evict it on failure.
    ///
    /// Holds only a weak reference, so the task ends once the handle leaves the cache.
    fn watch_preloaded(&self, path: String, handle: &Arc<dyn MediaHandle>) {
        let mut signals = handle.signals();
        let weak = Arc::downgrade(handle);
        let inner = Arc::clone(&self.inner);

        tokio::spawn(async move {
            let reason = loop {
                let Some(handle) = weak.upgrade() else {
                    return;
                };
                if let Some(reason) = handle.failure() {
                    break reason;
                }
                if handle.is_ready() {
                    return;
                }
                drop(handle);

                match signals.recv().await {
                    Ok(MediaSignal::Error(reason)) => break reason,
                    Ok(MediaSignal::Ready) | Err(RecvError::Closed) => return,
                    Ok(MediaSignal::Ended) | Err(RecvError::Lagged(_)) => continue,
                }
            };

            inner.lock().await.evict_failed_preload(&path, &weak, &reason);
        });
    }

    pub async fn get_status(&self) -> PlaybackStatus {
        let inner = self.inner.lock().await;
        let is_playing = inner
            .active
            .as_ref()
            .and_then(|path| inner.handles.get(path))
            .map_or(false, |cached| cached.state == HandleState::Playing);

        PlaybackStatus {
            is_playing,
            current_path: inner.active.clone(),
            volume: inner.volume,
        }
    }

    /// State of the cached handle for `path`, if one is cached.
    pub async fn handle_state(&self, path: &str) -> Option<HandleState> {
        self.inner.lock().await.handles.get(path).map(|cached| cached.state)
    }

    /// Stop playback and drop every cached handle.
    pub async fn clear_cache(&self) {
        let mut inner = self.inner.lock().await;
        inner.stop_active();
        inner.handles.clear();
    }
}
