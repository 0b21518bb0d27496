//! aniflix-player - multi-source video delivery engine
//!
//! Lets one playback surface switch between HLS streams, direct files,
//! embedded third-party players and backend-extracted playlists, with clean
//! teardown between switches, one cue model for SRT/VTT/XML subtitles and
//! throttled watch-progress reporting.
//!
//! # Modules
//!
//! - `models` - Sources, subtitles, cues, tracks, progress samples
//! - `api` - Backend client (extraction, watch progress)
//! - `stream` - Adapters, lifecycle controller, subtitles, progress
//! - `notify` - Transient user notices
//! - `error` - Error taxonomy
//! - `config` - Config file and environment overrides
//! - `logging` - tracing subscriber setup
//! - `cli`, `commands` - Command line surface

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod notify;
pub mod stream;

// Re-export commonly used types
pub use models::{
    Cue, EpisodeView, ProgressSample, QualityOption, SourceDescriptor, SourceKind, SubFormat,
    SubtitleDescriptor, Track,
};

pub use api::BackendClient;
pub use config::Config;
pub use error::{ErrorClass, PlayerError};
pub use notify::{Notice, NoticeBoard, NoticeLevel};
pub use stream::{LifecycleController, PlayerState, SubtitleChoice, SubtitleState};
