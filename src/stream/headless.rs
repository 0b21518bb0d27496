//! Headless host
//!
//! A [`MediaSurface`] and decode engine that play nothing and record
//! everything. Used by the `play` command to dry-run a session and by tests
//! to observe what the player did to the surface.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::api::backend::ProgressSink;
use crate::error::PlayerError;
use crate::models::{ProgressSample, Track};
use crate::stream::surface::{
    DecodeEngine, EngineFactory, MediaSurface, ResourceHandle, SessionToken, Subscription,
    UiToggle,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// =============================================================================
// Surface
// =============================================================================

/// One recorded surface operation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", content = "arg", rename_all = "snake_case")]
pub enum SurfaceOp {
    SetSource(String),
    ClearSource,
    Seek(f64),
    ShowEmbed(String),
    HideEmbed,
    ShowToggle(UiToggle),
    HideToggle(UiToggle),
    AddTrack(String),
    RemoveTracks,
    Fabricate(String),
    Revoke(String),
    Subscribe(u64),
    Unsubscribe(u64),
}

#[derive(Debug, Default)]
struct SurfaceState {
    source: Option<String>,
    embed: Option<String>,
    position: f64,
    toggles: HashSet<UiToggle>,
    tracks: Vec<Track>,
    handles: HashMap<String, String>,
    subscriptions: HashMap<u64, SessionToken>,
    next_id: u64,
    overlaps: usize,
    ops: Vec<SurfaceOp>,
}

impl SurfaceState {
    fn bound(&self) -> usize {
        usize::from(self.source.is_some()) + usize::from(self.embed.is_some())
    }
}

/// Point-in-time view of a [`HeadlessSurface`]
#[derive(Debug, Clone, Serialize)]
pub struct SurfaceSnapshot {
    pub source: Option<String>,
    pub embed: Option<String>,
    pub position: f64,
    pub toggles: Vec<UiToggle>,
    pub tracks: Vec<String>,
    pub live_handles: usize,
    pub subscriptions: usize,
    pub overlaps: usize,
}

/// Recording media surface
///
/// Clones share state, so a test can keep one clone while the controller
/// owns another.
#[derive(Clone, Default)]
pub struct HeadlessSurface {
    state: Arc<Mutex<SurfaceState>>,
    native_hls: bool,
}

impl HeadlessSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// A surface that plays HLS without a decode engine
    pub fn with_native_hls() -> Self {
        Self {
            native_hls: true,
            ..Self::default()
        }
    }

    /// Move the playback clock
    pub fn set_position(&self, seconds: f64) {
        lock(&self.state).position = seconds;
    }

    pub fn source(&self) -> Option<String> {
        lock(&self.state).source.clone()
    }

    pub fn embed(&self) -> Option<String> {
        lock(&self.state).embed.clone()
    }

    /// Number of things currently bound (source plus embed frame)
    pub fn bound(&self) -> usize {
        lock(&self.state).bound()
    }

    /// Times something was bound while something else already was
    pub fn overlaps(&self) -> usize {
        lock(&self.state).overlaps
    }

    pub fn tracks(&self) -> Vec<Track> {
        lock(&self.state).tracks.clone()
    }

    pub fn is_visible(&self, toggle: UiToggle) -> bool {
        lock(&self.state).toggles.contains(&toggle)
    }

    pub fn live_handles(&self) -> Vec<String> {
        lock(&self.state).handles.keys().cloned().collect()
    }

    /// Content behind a live handle
    pub fn handle_content(&self, handle: &str) -> Option<String> {
        lock(&self.state).handles.get(handle).cloned()
    }

    pub fn subscriptions(&self) -> usize {
        lock(&self.state).subscriptions.len()
    }

    pub fn ops(&self) -> Vec<SurfaceOp> {
        lock(&self.state).ops.clone()
    }

    pub fn snapshot(&self) -> SurfaceSnapshot {
        let state = lock(&self.state);
        let mut toggles: Vec<UiToggle> = state.toggles.iter().copied().collect();
        toggles.sort_by_key(|t| *t as u8);
        SurfaceSnapshot {
            source: state.source.clone(),
            embed: state.embed.clone(),
            position: state.position,
            toggles,
            tracks: state.tracks.iter().map(|t| t.language.clone()).collect(),
            live_handles: state.handles.len(),
            subscriptions: state.subscriptions.len(),
            overlaps: state.overlaps,
        }
    }
}

impl MediaSurface for HeadlessSurface {
    fn set_source(&self, url: &str) {
        let mut state = lock(&self.state);
        if state.bound() > 0 {
            tracing::error!(url, "source bound while the surface is in use");
            state.overlaps += 1;
        }
        state.source = Some(url.to_string());
        state.ops.push(SurfaceOp::SetSource(url.to_string()));
    }

    fn clear_source(&self) {
        let mut state = lock(&self.state);
        state.source = None;
        state.ops.push(SurfaceOp::ClearSource);
    }

    fn position(&self) -> f64 {
        lock(&self.state).position
    }

    fn seek(&self, seconds: f64) {
        let mut state = lock(&self.state);
        state.position = seconds;
        state.ops.push(SurfaceOp::Seek(seconds));
    }

    fn plays_hls_natively(&self) -> bool {
        self.native_hls
    }

    fn show_embed(&self, url: &str) {
        let mut state = lock(&self.state);
        if state.bound() > 0 {
            tracing::error!(url, "embed shown while the surface is in use");
            state.overlaps += 1;
        }
        state.embed = Some(url.to_string());
        state.ops.push(SurfaceOp::ShowEmbed(url.to_string()));
    }

    fn hide_embed(&self) {
        let mut state = lock(&self.state);
        state.embed = None;
        state.ops.push(SurfaceOp::HideEmbed);
    }

    fn set_toggle(&self, toggle: UiToggle, visible: bool) {
        let mut state = lock(&self.state);
        let changed = if visible {
            state.toggles.insert(toggle)
        } else {
            state.toggles.remove(&toggle)
        };
        if changed {
            let op = if visible {
                SurfaceOp::ShowToggle(toggle)
            } else {
                SurfaceOp::HideToggle(toggle)
            };
            state.ops.push(op);
        }
    }

    fn add_track(&self, track: &Track) {
        let mut state = lock(&self.state);
        state.tracks.push(track.clone());
        state.ops.push(SurfaceOp::AddTrack(track.language.clone()));
    }

    fn remove_all_tracks(&self) {
        let mut state = lock(&self.state);
        if !state.tracks.is_empty() {
            state.tracks.clear();
            state.ops.push(SurfaceOp::RemoveTracks);
        }
    }

    fn fabricate_handle(&self, content: &str, _mime: &str) -> ResourceHandle {
        let url = format!("blob:aniflix/{}", uuid::Uuid::new_v4());
        let mut state = lock(&self.state);
        state.handles.insert(url.clone(), content.to_string());
        state.ops.push(SurfaceOp::Fabricate(url.clone()));
        ResourceHandle::new(url)
    }

    fn revoke_handle(&self, handle: &ResourceHandle) {
        let mut state = lock(&self.state);
        if state.handles.remove(handle.as_str()).is_some() {
            state.ops.push(SurfaceOp::Revoke(handle.to_string()));
        }
    }

    fn subscribe(&self, token: SessionToken) -> Subscription {
        let mut state = lock(&self.state);
        state.next_id += 1;
        let id = state.next_id;
        state.subscriptions.insert(id, token);
        state.ops.push(SurfaceOp::Subscribe(id));
        Subscription { id, token }
    }

    fn unsubscribe(&self, subscription: &Subscription) {
        let mut state = lock(&self.state);
        if state.subscriptions.remove(&subscription.id).is_some() {
            state.ops.push(SurfaceOp::Unsubscribe(subscription.id));
        }
    }
}

// =============================================================================
// Decode Engine
// =============================================================================

/// Counters shared by every engine of a [`HeadlessEngineFactory`]
#[derive(Debug, Clone, Default, Serialize)]
pub struct EngineStats {
    pub created: usize,
    pub destroyed: usize,
    pub manifests: Vec<String>,
    pub start_loads: usize,
}

impl EngineStats {
    /// Engines created and not yet destroyed
    pub fn live(&self) -> usize {
        self.created - self.destroyed
    }
}

/// Factory for recording decode engines
#[derive(Clone)]
pub struct HeadlessEngineFactory {
    supported: bool,
    stats: Arc<Mutex<EngineStats>>,
}

impl HeadlessEngineFactory {
    pub fn new() -> Self {
        Self {
            supported: true,
            stats: Arc::default(),
        }
    }

    /// A factory reporting that the host cannot run the engine
    pub fn unsupported() -> Self {
        Self {
            supported: false,
            ..Self::new()
        }
    }

    pub fn stats(&self) -> EngineStats {
        lock(&self.stats).clone()
    }
}

impl Default for HeadlessEngineFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineFactory for HeadlessEngineFactory {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn create(&self) -> Box<dyn DecodeEngine> {
        lock(&self.stats).created += 1;
        Box::new(HeadlessEngine {
            stats: self.stats.clone(),
            manifest: None,
            attached: false,
            destroyed: false,
        })
    }
}

struct HeadlessEngine {
    stats: Arc<Mutex<EngineStats>>,
    manifest: Option<String>,
    attached: bool,
    destroyed: bool,
}

impl DecodeEngine for HeadlessEngine {
    fn load_source(&mut self, manifest_url: &str) {
        self.manifest = Some(manifest_url.to_string());
        lock(&self.stats).manifests.push(manifest_url.to_string());
    }

    fn attach_media(&mut self, surface: &dyn MediaSurface) {
        let manifest = self.manifest.as_deref().unwrap_or("");
        surface.set_source(&format!("mse:{}", manifest));
        self.attached = true;
    }

    fn start_load(&mut self) {
        lock(&self.stats).start_loads += 1;
    }

    fn stop_load(&mut self) {}

    fn detach_media(&mut self, surface: &dyn MediaSurface) {
        if self.attached {
            surface.clear_source();
            self.attached = false;
        }
    }

    fn destroy(&mut self) {
        if !self.destroyed {
            self.destroyed = true;
            self.manifest = None;
            lock(&self.stats).destroyed += 1;
        }
    }
}

// =============================================================================
// Progress Sink
// =============================================================================

/// Progress sink that keeps reports in memory
#[derive(Default)]
pub struct RecordingProgressSink {
    samples: Mutex<Vec<ProgressSample>>,
    reject: bool,
}

impl RecordingProgressSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that records and then refuses every report
    pub fn rejecting() -> Self {
        Self {
            reject: true,
            ..Self::default()
        }
    }

    pub fn samples(&self) -> Vec<ProgressSample> {
        lock(&self.samples).clone()
    }
}

#[async_trait]
impl ProgressSink for RecordingProgressSink {
    async fn report(&self, sample: &ProgressSample) -> Result<(), PlayerError> {
        lock(&self.samples).push(sample.clone());
        if self.reject {
            return Err(PlayerError::Rejected("recording sink rejects".to_string()));
        }
        Ok(())
    }
}
