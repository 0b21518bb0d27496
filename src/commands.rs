//! CLI Command Handlers
//!
//! Implements all CLI commands by calling the player core.
//! Each handler takes CLI args, the effective config and Output, returns ExitCode.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::api::backend::ProgressSink;
use crate::api::BackendClient;
use crate::cli::{ConfigCmd, ExitCode, ExtractCmd, Output, PlayCmd, SubsCmd};
use crate::config::Config;
use crate::error::PlayerError;
use crate::models::{Cue, EpisodeView, ProgressSample, SubFormat};
use crate::notify::Notice;
use crate::stream::headless::{EngineStats, SurfaceSnapshot};
use crate::stream::{
    subtitles, HeadlessEngineFactory, HeadlessSurface, LifecycleController, PlayerState,
    MediaSurface, RecordingProgressSink, Services, SessionToken, SubtitleChoice, SubtitleClient,
    SubtitleState, SurfaceEvent,
};

// =============================================================================
// Subs Command
// =============================================================================

/// Parsed subtitle file
#[derive(Debug, Serialize)]
pub struct SubsOutput {
    pub format: SubFormat,
    pub count: usize,
    pub cues: Vec<Cue>,
}

pub async fn subs_cmd(cmd: SubsCmd, config: &Config, output: &Output) -> ExitCode {
    let format = cmd.resolved_format();
    let at = match cmd.at_seconds().transpose() {
        Ok(at) => at,
        Err(e) => return output.error(e, ExitCode::InvalidArgs),
    };

    output.info(format!("Parsing {} subtitles: {}", format, cmd.input));

    let text = if cmd.is_remote() {
        let client = SubtitleClient::with_base_url(&config.backend_url);
        match client.download(&cmd.input).await {
            Ok(text) => text,
            Err(e) => return output.player_error("Subtitle download failed", &e),
        }
    } else {
        match tokio::fs::read_to_string(&cmd.input).await {
            Ok(text) => text,
            Err(e) => {
                return output.error(
                    format!("Could not read {}: {}", cmd.input, e),
                    ExitCode::InvalidArgs,
                )
            }
        }
    };

    let cues = match subtitles::parse(&text, format) {
        Ok(cues) => cues,
        Err(e) => return output.player_error("Subtitle parse failed", &PlayerError::from(e)),
    };

    let result = match at {
        Some(seconds) => {
            let cue = cues.into_iter().find(|c| c.covers(seconds));
            output.print(&cue)
        }
        None => output.print(SubsOutput {
            format,
            count: cues.len(),
            cues,
        }),
    };
    if let Err(e) = result {
        return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
    }
    ExitCode::Success
}

// =============================================================================
// Extract Command
// =============================================================================

/// Extraction result
#[derive(Debug, Serialize)]
pub struct ExtractOutput {
    pub url: String,
    pub lines: usize,
    pub playlist: String,
}

pub async fn extract_cmd(cmd: ExtractCmd, config: &Config, output: &Output) -> ExitCode {
    let timeout = cmd
        .timeout
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.extraction_timeout());
    let client = BackendClient::new(&config.backend_url).with_extraction_timeout(timeout);

    output.info(format!("Extracting playlist for: {}", cmd.url));

    match client.extract_playlist(&cmd.url).await {
        Ok(playlist) => {
            if !output.json {
                output.print_raw(&playlist);
                return ExitCode::Success;
            }
            let data = ExtractOutput {
                url: cmd.url,
                lines: playlist.lines().count(),
                playlist,
            };
            if let Err(e) = output.print(data) {
                return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
            }
            ExitCode::Success
        }
        Err(e) => output.player_error("Extraction failed", &e),
    }
}

// =============================================================================
// Play Command
// =============================================================================

/// Result of one source switch
#[derive(Debug, Serialize)]
pub struct SwitchOutcome {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<SessionToken>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Everything observed during a dry-run session
#[derive(Debug, Serialize)]
pub struct PlayReport {
    pub episode_id: u64,
    pub switches: Vec<SwitchOutcome>,
    pub state: PlayerState,
    pub subtitles: SubtitleState,
    pub surface: SurfaceSnapshot,
    pub engines: EngineStats,
    pub notices: Vec<Notice>,
    /// Progress reports kept locally (with --no-report)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reports: Option<Vec<ProgressSample>>,
    /// Whether cleanup left the surface with nothing bound
    pub released: bool,
}

pub async fn play_cmd(cmd: PlayCmd, config: &Config, output: &Output) -> ExitCode {
    let view = match load_episode(&cmd).await {
        Ok(view) => view,
        Err((code, msg)) => return output.error(msg, code),
    };
    if view.sources.is_empty() {
        return output.error("Episode has no sources", ExitCode::InvalidArgs);
    }

    let surface = if cmd.native_hls {
        HeadlessSurface::with_native_hls()
    } else {
        HeadlessSurface::new()
    };
    let engines = if cmd.native_hls {
        HeadlessEngineFactory::unsupported()
    } else {
        HeadlessEngineFactory::new()
    };

    let backend = Arc::new(
        BackendClient::new(&config.backend_url)
            .with_extraction_timeout(config.extraction_timeout()),
    );
    let recorder = Arc::new(RecordingProgressSink::new());
    let progress: Arc<dyn ProgressSink> = if cmd.no_report {
        recorder.clone()
    } else {
        backend.clone()
    };

    let services = Services {
        engines: Arc::new(engines.clone()),
        backend,
        subtitles: Arc::new(SubtitleClient::with_base_url(&config.backend_url)),
        progress,
    };
    let episode_id = view.episode_id;
    let controller = LifecycleController::new(
        view,
        Box::new(surface.clone()),
        services,
        config.controller_settings(),
    );

    let mut switches = Vec::new();
    let mut last_failure = None;
    for &index in &cmd.sources {
        output.info(format!("Switching to source #{}", index));
        match controller.switch_to(index).await {
            Ok(token) => switches.push(SwitchOutcome {
                index,
                token: Some(token),
                error: None,
            }),
            Err(e) => {
                switches.push(SwitchOutcome {
                    index,
                    token: None,
                    error: Some(e.to_string()),
                });
                last_failure = Some(e);
            }
        }
    }

    if controller.state().is_attached() {
        last_failure = None;

        if let Some(code) = &cmd.subtitle {
            let choice = if code.eq_ignore_ascii_case("off") {
                SubtitleChoice::Off
            } else {
                SubtitleChoice::Language(code.clone())
            };
            // Reported through the notice board; playback goes on
            let _ = controller.select_subtitle(choice).await;
        }
        if let Some(label) = &cmd.quality {
            let _ = controller.select_quality(label).await;
        }

        simulate_playback(&controller, &surface, &cmd).await;
    }
    controller.flush_reports().await;

    let state = controller.state();
    let subtitles = controller.subtitle_state().await;
    let snapshot = surface.snapshot();
    let notices = controller.notices().visible();

    controller.cleanup().await;
    let released = surface.bound() == 0 && surface.live_handles().is_empty();

    let report = PlayReport {
        episode_id,
        switches,
        state,
        subtitles,
        surface: snapshot,
        engines: engines.stats(),
        notices,
        reports: cmd.no_report.then(|| recorder.samples()),
        released,
    };

    if let Err(e) = output.print(&report) {
        return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
    }

    match last_failure {
        Some(e) => ExitCode::for_error(&e),
        None => ExitCode::Success,
    }
}

async fn load_episode(cmd: &PlayCmd) -> Result<EpisodeView, (ExitCode, String)> {
    let text = tokio::fs::read_to_string(&cmd.episode).await.map_err(|e| {
        (
            ExitCode::InvalidArgs,
            format!("Could not read {}: {}", cmd.episode.display(), e),
        )
    })?;
    serde_json::from_str(&text).map_err(|e| {
        (
            ExitCode::ParseError,
            format!("Invalid episode file {}: {}", cmd.episode.display(), e),
        )
    })
}

/// Drive the playback clock of the attached session
async fn simulate_playback(
    controller: &LifecycleController,
    surface: &HeadlessSurface,
    cmd: &PlayCmd,
) {
    let token = controller.current_token();
    let tick = Duration::from_millis(cmd.tick_ms.max(1));
    let total = Duration::from_secs(cmd.seconds);

    let mut elapsed = Duration::ZERO;
    while elapsed < total {
        tokio::time::sleep(tick).await;
        elapsed += tick;

        let position = (surface.position() + tick.as_secs_f64()).min(cmd.duration);
        surface.set_position(position);
        controller
            .dispatch(
                token,
                SurfaceEvent::TimeUpdate {
                    position,
                    duration: cmd.duration,
                },
            )
            .await;
    }

    if cmd.ended {
        controller.dispatch(token, SurfaceEvent::Ended).await;
    }
}

// =============================================================================
// Config Command
// =============================================================================

/// Effective configuration and where it lives
#[derive(Debug, Serialize)]
pub struct ConfigOutput<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub saved: bool,
    pub config: &'a Config,
}

pub async fn config_cmd(cmd: ConfigCmd, config: &Config, output: &Output) -> ExitCode {
    if cmd.init {
        if let Err(e) = config.save() {
            return output.error(format!("Could not save config: {}", e), ExitCode::Error);
        }
        output.info("Config saved");
    }

    let data = ConfigOutput {
        path: Config::path().map(|p| p.display().to_string()),
        saved: cmd.init,
        config,
    };
    if let Err(e) = output.print(data) {
        return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
    }
    ExitCode::Success
}
