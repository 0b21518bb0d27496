//! CLI - Command Line Interface for aniflix-player
//!
//! Every player operation is scriptable and all output is JSON-parseable.
//!
//! # Examples
//!
//! ```bash
//! # Normalize a subtitle file into cues
//! aniflix-player subs episode-12.en.srt
//!
//! # Ask the backend for a playlist
//! aniflix-player extract "https://www.iqiyi.com/v_19rr7p.html"
//!
//! # Dry-run a session: switch to source 1, then 0, load English subtitles
//! aniflix-player play episode.json --source 1 --source 0 --subtitle en --seconds 12
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::io::IsTerminal;
use std::path::PathBuf;

use crate::error::{ErrorClass, PlayerError};
use crate::models::SubFormat;

// =============================================================================
// Exit Codes
// =============================================================================

/// Exit codes for CLI operations (semantic for scripting)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success
    Success = 0,
    /// General error
    Error = 1,
    /// Invalid arguments
    InvalidArgs = 2,
    /// Network error
    NetworkError = 3,
    /// Malformed input (subtitles, episode file)
    ParseError = 4,
    /// A source could not be played
    PlaybackFailed = 5,
}

impl ExitCode {
    /// Exit code for a player error
    pub fn for_error(err: &PlayerError) -> Self {
        match err.class() {
            ErrorClass::Transport => ExitCode::NetworkError,
            ErrorClass::Parse => ExitCode::ParseError,
            ErrorClass::Decode => ExitCode::PlaybackFailed,
            ErrorClass::Policy => ExitCode::InvalidArgs,
            ErrorClass::Superseded => ExitCode::Error,
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> std::process::ExitCode {
        std::process::ExitCode::from(code as u8)
    }
}

// =============================================================================
// Main CLI Structure
// =============================================================================

/// aniflix-player - multi-source episode playback engine
#[derive(Parser, Debug)]
#[command(
    name = "aniflix-player",
    version,
    about = "Multi-source episode playback engine",
    long_about = "Switches one playback surface between HLS streams, direct files, \
                  embedded players and backend-extracted playlists, with subtitle \
                  normalization and watch-progress reporting.\n\n\
                  The play command runs a session against a headless surface and \
                  prints what happened to it.",
    after_help = "EXAMPLES:\n\
                  aniflix-player subs ep12.vtt                 Print cues as JSON\n\
                  aniflix-player extract <page-url>            Fetch an extracted playlist\n\
                  aniflix-player play ep.json -s 1 -S en       Dry-run a session\n\
                  aniflix-player config                        Show effective config"
)]
pub struct Cli {
    /// Output format as JSON (default for non-TTY)
    #[arg(long, short = 'j', global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Path to config file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Backend base URL (overrides config)
    #[arg(long, global = true)]
    pub backend: Option<String>,

    /// Log filter (overrides config, e.g. "debug" or "aniflix_player=trace")
    #[arg(long, global = true)]
    pub log: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Check if JSON output should be used
    pub fn should_json(&self) -> bool {
        self.json || !std::io::stdout().is_terminal()
    }
}

// =============================================================================
// Subcommands
// =============================================================================

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Parse a subtitle file or URL into cues
    #[command(visible_alias = "sub")]
    Subs(SubsCmd),

    /// Exchange a page URL for a playlist through the backend
    #[command(visible_alias = "x")]
    Extract(ExtractCmd),

    /// Run a playback session against a headless surface
    #[command(visible_alias = "p")]
    Play(PlayCmd),

    /// Show or initialize the configuration
    Config(ConfigCmd),
}

// =============================================================================
// Subs Command
// =============================================================================

/// Parse a subtitle file into the common cue model
#[derive(Args, Debug)]
pub struct SubsCmd {
    /// Local path or http(s) URL of the subtitle file
    #[arg(required = true)]
    pub input: String,

    /// Subtitle format (guessed from the extension if omitted)
    #[arg(long, short = 'f', value_enum)]
    pub format: Option<SubFormatArg>,

    /// Only print the cue on screen at this time (seconds or HH:MM:SS)
    #[arg(long)]
    pub at: Option<String>,
}

impl SubsCmd {
    pub fn resolved_format(&self) -> SubFormat {
        match self.format {
            Some(format) => format.into(),
            None => SubFormat::from_path(&self.input),
        }
    }

    pub fn is_remote(&self) -> bool {
        self.input.starts_with("http://") || self.input.starts_with("https://")
    }

    /// Parse the --at argument to seconds
    pub fn at_seconds(&self) -> Option<Result<f64, String>> {
        self.at.as_deref().map(|s| {
            parse_clock(s)
                .ok_or_else(|| format!("Invalid time '{}' (expected seconds or HH:MM:SS)", s))
        })
    }
}

/// Subtitle format argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SubFormatArg {
    Srt,
    #[value(alias = "webvtt")]
    Vtt,
    Xml,
}

impl From<SubFormatArg> for SubFormat {
    fn from(arg: SubFormatArg) -> Self {
        match arg {
            SubFormatArg::Srt => SubFormat::Srt,
            SubFormatArg::Vtt => SubFormat::Vtt,
            SubFormatArg::Xml => SubFormat::Xml,
        }
    }
}

/// Parse a clock value (plain seconds, MM:SS or HH:MM:SS) to seconds
fn parse_clock(s: &str) -> Option<f64> {
    let s = s.trim();
    if let Ok(secs) = s.parse::<f64>() {
        return (secs >= 0.0).then_some(secs);
    }
    let parts: Vec<&str> = s.split(':').collect();
    match parts.len() {
        2 => {
            let mins: u64 = parts[0].parse().ok()?;
            let secs: f64 = parts[1].parse().ok()?;
            Some(mins as f64 * 60.0 + secs)
        }
        3 => {
            let hours: u64 = parts[0].parse().ok()?;
            let mins: u64 = parts[1].parse().ok()?;
            let secs: f64 = parts[2].parse().ok()?;
            Some(hours as f64 * 3600.0 + mins as f64 * 60.0 + secs)
        }
        _ => None,
    }
}

// =============================================================================
// Extract Command
// =============================================================================

/// Ask the backend to extract a playlist for a page URL
#[derive(Args, Debug)]
pub struct ExtractCmd {
    /// Play-page URL to extract
    #[arg(required = true)]
    pub url: String,

    /// Request timeout in seconds (overrides config)
    #[arg(long, short = 't')]
    pub timeout: Option<u64>,
}

// =============================================================================
// Play Command
// =============================================================================

/// Dry-run a playback session for an episode
#[derive(Args, Debug)]
pub struct PlayCmd {
    /// Episode view JSON file (episode_id, sources, subtitles)
    #[arg(required = true)]
    pub episode: PathBuf,

    /// Source indices to switch to, in order (repeatable)
    #[arg(long = "source", short = 's', default_values_t = vec![0usize])]
    pub sources: Vec<usize>,

    /// Subtitle language code to load after attaching
    #[arg(long, short = 'S')]
    pub subtitle: Option<String>,

    /// Quality label to select after attaching (progressive sources)
    #[arg(long, short = 'Q')]
    pub quality: Option<String>,

    /// Seconds of playback to simulate after attaching
    #[arg(long, default_value = "0")]
    pub seconds: u64,

    /// Playback clock tick in milliseconds
    #[arg(long, default_value = "250")]
    pub tick_ms: u64,

    /// Episode runtime in seconds reported with each clock tick
    #[arg(long, default_value = "1440")]
    pub duration: f64,

    /// Keep progress reports local instead of sending them to the backend
    #[arg(long)]
    pub no_report: bool,

    /// Pretend the surface plays HLS natively and has no decode engine
    #[arg(long)]
    pub native_hls: bool,

    /// Stop the session with an end-of-playback event
    #[arg(long)]
    pub ended: bool,
}

// =============================================================================
// Config Command
// =============================================================================

/// Show the effective configuration
#[derive(Args, Debug)]
pub struct ConfigCmd {
    /// Write the effective configuration to the default config path
    #[arg(long)]
    pub init: bool,
}

// =============================================================================
// JSON Output Types
// =============================================================================

/// Generic JSON output wrapper with status
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonOutput<T: Serialize> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "is_zero")]
    pub exit_code: i32,
}

fn is_zero(n: &i32) -> bool {
    *n == 0
}

impl<T: Serialize> JsonOutput<T> {
    /// Create success output with data
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
            exit_code: 0,
        }
    }

    /// Create error output (no data)
    pub fn error_msg(msg: impl Into<String>, code: ExitCode) -> JsonOutput<()> {
        JsonOutput::<()> {
            data: None,
            error: Some(msg.into()),
            exit_code: code.into(),
        }
    }
}

// =============================================================================
// Output Helpers
// =============================================================================

/// Output handler for consistent formatting
pub struct Output {
    pub json: bool,
    pub quiet: bool,
}

impl Output {
    pub fn new(cli: &Cli) -> Self {
        Self {
            json: cli.should_json(),
            quiet: cli.quiet,
        }
    }

    /// Print success data
    pub fn print<T: Serialize>(&self, data: T) -> anyhow::Result<()> {
        if self.json {
            let output = JsonOutput::success(data);
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("{}", serde_json::to_string_pretty(&data)?);
        }
        Ok(())
    }

    /// Print raw text (playlists, config files)
    pub fn print_raw(&self, text: &str) {
        println!("{}", text.trim_end());
    }

    /// Print error and return exit code
    pub fn error(&self, msg: impl Into<String>, code: ExitCode) -> ExitCode {
        let msg = msg.into();
        if self.json {
            let output = JsonOutput::<()>::error_msg(&msg, code);
            if let Ok(json) = serde_json::to_string_pretty(&output) {
                eprintln!("{}", json);
            }
        } else if !self.quiet {
            eprintln!("Error: {}", msg);
        }
        code
    }

    /// Print a player error with its semantic exit code
    pub fn player_error(&self, context: &str, err: &PlayerError) -> ExitCode {
        self.error(format!("{}: {}", context, err), ExitCode::for_error(err))
    }

    /// Print info message (suppressed in quiet mode)
    pub fn info(&self, msg: impl std::fmt::Display) {
        if !self.quiet && !self.json {
            eprintln!("{}", msg);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
