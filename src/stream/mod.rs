//! Playback core
//!
//! - Surface: host seams (media surface, decode engine)
//! - Adapter: one binding per source kind
//! - Controller: session lifecycle, switching, subtitles
//! - Subtitles: SRT/VTT/XML normalization and download
//! - Progress: throttled watch-progress reporting
//! - Headless: recording host for dry runs and tests

pub mod adapter;
pub mod controller;
pub mod headless;
pub mod progress;
pub mod subtitles;
pub mod surface;

pub use controller::{
    ControllerSettings, ExtractionFallback, LifecycleController, PlayerState, Services,
    SubtitleChoice, SubtitleState,
};
pub use headless::{HeadlessEngineFactory, HeadlessSurface, RecordingProgressSink};
pub use progress::ProgressReporter;
pub use subtitles::SubtitleClient;
pub use surface::{MediaSurface, SessionToken, SurfaceEvent, UiToggle};
