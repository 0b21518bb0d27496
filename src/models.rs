//! Data structures and types for the player core
//!
//! Contains the shared models used across the crate organized by domain:
//! - **Sources**: source kinds, descriptors and declared quality options
//! - **Subtitles**: subtitle descriptors, cues and tracks
//! - **Episode**: the per-episode view handed to the player by a page
//! - **Progress**: samples sent to the watch-progress endpoint

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PlayerError;

// =============================================================================
// Source Models
// =============================================================================

/// Kind of content source a descriptor points at
///
/// Deserializes from any of the loose backend names, see
/// [`SourceKind::from_str_loose`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum SourceKind {
    /// Manifest-described chunked HTTP streaming (HLS)
    Segmented,
    /// Direct file playback
    Progressive,
    /// Third-party player inside a sandboxed frame
    Embedded,
    /// Page URL exchanged for a playlist through the backend
    Extracted,
    /// Anything the player does not know how to bind
    Unsupported,
}

impl From<String> for SourceKind {
    fn from(s: String) -> Self {
        SourceKind::from_str_loose(&s)
    }
}

impl SourceKind {
    /// Parse a kind from the loose names used by the content backend
    pub fn from_str_loose(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "segmented" | "hls" | "m3u8" => SourceKind::Segmented,
            "progressive" | "mp4" | "direct" | "file" => SourceKind::Progressive,
            "embedded" | "embed" | "iframe" => SourceKind::Embedded,
            "extracted" | "extract" | "iqiyi" | "play" => SourceKind::Extracted,
            _ => SourceKind::Unsupported,
        }
    }

    /// Short label for menus and logs
    pub fn label(&self) -> &'static str {
        match self {
            SourceKind::Segmented => "segmented",
            SourceKind::Progressive => "progressive",
            SourceKind::Embedded => "embedded",
            SourceKind::Extracted => "extracted",
            SourceKind::Unsupported => "unsupported",
        }
    }
}

impl FromStr for SourceKind {
    type Err = PlayerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match SourceKind::from_str_loose(s) {
            SourceKind::Unsupported => Err(PlayerError::UnsupportedSource(s.to_string())),
            kind => Ok(kind),
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One entry of a progressive source's pre-declared quality set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityOption {
    pub label: String,
    pub url: String,
}

/// A playable source for an episode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    pub kind: SourceKind,
    pub url: String,
    #[serde(default)]
    pub label: Option<String>,
    /// Static quality set (progressive sources only)
    #[serde(default)]
    pub qualities: Vec<QualityOption>,
}

impl SourceDescriptor {
    pub fn new(kind: SourceKind, url: impl Into<String>) -> Self {
        Self {
            kind,
            url: url.into(),
            label: None,
            qualities: Vec::new(),
        }
    }

    /// Attach a display label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Attach a declared quality option
    pub fn with_quality(mut self, label: impl Into<String>, url: impl Into<String>) -> Self {
        self.qualities.push(QualityOption {
            label: label.into(),
            url: url.into(),
        });
        self
    }

    /// Whether the url field carries playlist text instead of a location
    pub fn is_inline_playlist(&self) -> bool {
        self.url.trim_start().starts_with("#EXTM3U")
    }

    /// Find a declared quality by label (case-insensitive)
    pub fn quality(&self, label: &str) -> Option<&QualityOption> {
        self.qualities
            .iter()
            .find(|q| q.label.eq_ignore_ascii_case(label))
    }
}

impl fmt::Display for SourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.label {
            Some(label) => write!(f, "[{}] {}", self.kind, label),
            None if self.is_inline_playlist() => write!(f, "[{}] <inline playlist>", self.kind),
            None => write!(f, "[{}] {}", self.kind, self.url),
        }
    }
}

// =============================================================================
// Subtitle Models
// =============================================================================

/// Subtitle text format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubFormat {
    Srt,
    #[serde(alias = "webvtt")]
    Vtt,
    Xml,
}

impl SubFormat {
    /// Parse format from file extension, defaulting to SRT
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "vtt" | "webvtt" => SubFormat::Vtt,
            "xml" | "ttml" | "dfxp" => SubFormat::Xml,
            _ => SubFormat::Srt,
        }
    }

    /// Guess the format from a path or URL
    pub fn from_path(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or(path);
        path.rsplit_once('.')
            .map(|(_, ext)| Self::from_extension(ext))
            .unwrap_or(SubFormat::Srt)
    }

    /// Get file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            SubFormat::Srt => "srt",
            SubFormat::Vtt => "vtt",
            SubFormat::Xml => "xml",
        }
    }
}

impl fmt::Display for SubFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubFormat::Srt => write!(f, "SRT"),
            SubFormat::Vtt => write!(f, "WebVTT"),
            SubFormat::Xml => write!(f, "XML"),
        }
    }
}

/// A subtitle file offered for an episode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleDescriptor {
    pub language: String,
    pub language_code: String,
    pub format: SubFormat,
    pub url: String,
}

impl fmt::Display for SubtitleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} ({})", self.language_code, self.language, self.format)
    }
}

/// A timestamped caption span, in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cue {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl Cue {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }

    /// Whether the cue is on screen at `seconds`
    pub fn covers(&self, seconds: f64) -> bool {
        self.start <= seconds && seconds < self.end
    }
}

/// An ordered cue list for one language
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub language: String,
    pub cues: Vec<Cue>,
}

impl Track {
    pub fn new(language: impl Into<String>, cues: Vec<Cue>) -> Self {
        Self {
            language: language.into(),
            cues,
        }
    }

    /// The first cue on screen at `seconds`, if any
    pub fn cue_at(&self, seconds: f64) -> Option<&Cue> {
        self.cues.iter().find(|c| c.covers(seconds))
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }
}

// =============================================================================
// Episode Models
// =============================================================================

/// Everything a watch page hands the player for one episode
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EpisodeView {
    pub episode_id: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub sources: Vec<SourceDescriptor>,
    #[serde(default)]
    pub subtitles: Vec<SubtitleDescriptor>,
}

impl EpisodeView {
    pub fn new(episode_id: u64) -> Self {
        Self {
            episode_id,
            ..Default::default()
        }
    }

    pub fn with_source(mut self, source: SourceDescriptor) -> Self {
        self.sources.push(source);
        self
    }

    pub fn with_subtitle(mut self, subtitle: SubtitleDescriptor) -> Self {
        self.subtitles.push(subtitle);
        self
    }

    /// Look up a subtitle by language code (case-insensitive)
    pub fn subtitle(&self, language_code: &str) -> Option<&SubtitleDescriptor> {
        self.subtitles
            .iter()
            .find(|s| s.language_code.eq_ignore_ascii_case(language_code))
    }
}

// =============================================================================
// Progress Models
// =============================================================================

/// One watch-progress report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSample {
    pub episode_id: u64,
    pub position_seconds: f64,
    pub duration_seconds: f64,
    pub completed: bool,
}

impl ProgressSample {
    /// Watched percentage, clamped to 0-100
    pub fn percent(&self) -> f64 {
        watched_percent(self.position_seconds, self.duration_seconds)
    }
}

impl fmt::Display for ProgressSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "episode {} at {} / {} ({:.0}%{})",
            self.episode_id,
            format_seconds(self.position_seconds),
            format_seconds(self.duration_seconds),
            self.percent(),
            if self.completed { ", completed" } else { "" }
        )
    }
}

/// Position as a percentage of duration, clamped to 0-100
pub fn watched_percent(position: f64, duration: f64) -> f64 {
    if !duration.is_finite() || duration <= 0.0 || !position.is_finite() {
        return 0.0;
    }
    (position / duration * 100.0).clamp(0.0, 100.0)
}

// =============================================================================
// Utility Functions
// =============================================================================

/// Format seconds as HH:MM:SS or MM:SS
pub fn format_seconds(seconds: f64) -> String {
    let total_secs = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    let hours = total_secs / 3600;
    let mins = (total_secs % 3600) / 60;
    let secs = total_secs % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, mins, secs)
    } else {
        format!("{:02}:{:02}", mins, secs)
    }
}
