//! Host seams: the shared media surface and the segmented-stream decode engine
//!
//! The surface is the single video element the page shows. The decode engine
//! is the HLS library that feeds it. Both live in the host; the player core
//! only sees them through these traits.

use std::fmt;

use crate::models::Track;

/// Monotonic identifier of one `switch_source` call
pub type SessionToken = u64;

/// Source-specific controls the player shows or hides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UiToggle {
    /// Progressive quality picker
    QualityMenu,
    /// Subtitle language picker
    SubtitleMenu,
    /// Sandboxed frame for embedded players
    EmbedFrame,
}

impl UiToggle {
    pub const ALL: [UiToggle; 3] = [
        UiToggle::QualityMenu,
        UiToggle::SubtitleMenu,
        UiToggle::EmbedFrame,
    ];
}

/// A locally fabricated resource (object URL) backed by in-memory content
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceHandle(String);

impl ResourceHandle {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Registration of an adapter for surface events
///
/// Created on attach, handed back on detach.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Subscription {
    pub id: u64,
    pub token: SessionToken,
}

/// Event raised by the surface, the decode engine or the embed frame
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    /// Decode engine error
    DecodeError { fatal: bool, detail: String },
    /// Nested document finished loading
    EmbedLoaded,
    /// Nested document failed to load
    EmbedFailed { detail: String },
    /// Playback clock tick
    TimeUpdate { position: f64, duration: f64 },
    Paused,
    Playing,
    Ended,
}

/// The shared video surface
pub trait MediaSurface: Send + Sync {
    /// Point the surface at a playable URL
    fn set_source(&self, url: &str);

    /// Drop the current source and stop playback
    fn clear_source(&self);

    /// Current playback position in seconds
    fn position(&self) -> f64;

    fn seek(&self, seconds: f64);

    /// Whether the surface plays HLS manifests without a decode engine
    fn plays_hls_natively(&self) -> bool;

    /// Show the sandboxed frame and load `url` into it
    fn show_embed(&self, url: &str);

    /// Hide the frame and unload its document
    fn hide_embed(&self);

    fn set_toggle(&self, toggle: UiToggle, visible: bool);

    fn add_track(&self, track: &Track);

    fn remove_all_tracks(&self);

    /// Create a local URL serving `content`
    fn fabricate_handle(&self, content: &str, mime: &str) -> ResourceHandle;

    /// Release a handle created by `fabricate_handle`
    fn revoke_handle(&self, handle: &ResourceHandle);

    fn subscribe(&self, token: SessionToken) -> Subscription;

    fn unsubscribe(&self, subscription: &Subscription);
}

/// Segmented-stream decode engine bound to one surface at a time
pub trait DecodeEngine: Send {
    /// Point the engine at a manifest
    fn load_source(&mut self, manifest_url: &str);

    fn attach_media(&mut self, surface: &dyn MediaSurface);

    /// (Re)start segment loading from the current manifest
    fn start_load(&mut self);

    fn stop_load(&mut self);

    fn detach_media(&mut self, surface: &dyn MediaSurface);

    /// Release every resource the engine holds
    fn destroy(&mut self);
}

/// Creates decode engines
pub trait EngineFactory: Send + Sync {
    /// Whether the host can run the engine at all
    fn is_supported(&self) -> bool;

    fn create(&self) -> Box<dyn DecodeEngine>;
}
