//! Lifecycle controller
//!
//! Owns the media surface, the one attached adapter and the active subtitle
//! track. Every source switch runs the same sequence:
//!
//! ```text
//! switch_source ──► Detaching ──► cleanup (+ teardown delay)
//!                                   │
//!                     superseded? ◄─┘── yes ──► Err(Superseded)
//!                                   │ no
//!                                   ▼
//!                   Attaching(kind) ──► attach ──► Attached(kind)
//!                                         │
//!                                         └── failure ──► Error
//! ```
//!
//! Each call takes a fresh session token. Work whose token is no longer
//! current never touches the surface. A switch waits for the cleanup of the
//! previous one instead of racing it, so two adapters are never bound at
//! once.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::api::backend::{ExtractionBackend, ProgressSink, SubtitleFetcher};
use crate::error::PlayerError;
use crate::models::{
    EpisodeView, ProgressSample, SourceDescriptor, SourceKind, SubtitleDescriptor, Track,
};
use crate::notify::NoticeBoard;
use crate::stream::adapter::{self, Adapter, AdapterDeps, AttachContext, EventOutcome};
use crate::stream::progress::{self, ProgressReporter};
use crate::stream::subtitles;
use crate::stream::surface::{EngineFactory, MediaSurface, SessionToken, SurfaceEvent, UiToggle};

// =============================================================================
// Public Types
// =============================================================================

/// What to do when an extracted source cannot be played
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionFallback {
    /// Report the failure and let the user pick another source
    #[default]
    FailClosed,
    /// Show the same URL in the embedded player instead
    Embed,
}

/// Controller lifecycle state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum PlayerState {
    Empty,
    Attaching(SourceKind),
    Attached(SourceKind),
    Detaching,
    Error(String),
}

impl PlayerState {
    pub fn is_attached(&self) -> bool {
        matches!(self, PlayerState::Attached(_))
    }
}

/// Subtitle menu state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "subtitles", content = "language", rename_all = "snake_case")]
pub enum SubtitleState {
    /// The episode has no subtitle descriptors
    Unavailable,
    /// Descriptors exist, none selected
    Off,
    /// Track for this language code is on the surface
    Active(String),
}

/// A subtitle menu selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubtitleChoice {
    Off,
    /// Language code of one of the episode's descriptors
    Language(String),
}

/// Tunables of a controller
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    /// Pause after detaching, letting the host finish decoder teardown
    pub cleanup_delay: Duration,
    pub progress_interval: Duration,
    pub completion_threshold: f64,
    pub notice_ttl: Duration,
    pub extraction_fallback: ExtractionFallback,
    /// Automatic retries of an extraction that failed at the network level
    pub extraction_retries: u32,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            cleanup_delay: Duration::from_millis(100),
            progress_interval: progress::DEFAULT_INTERVAL,
            completion_threshold: progress::DEFAULT_COMPLETION_THRESHOLD,
            notice_ttl: Duration::from_secs(5),
            extraction_fallback: ExtractionFallback::FailClosed,
            extraction_retries: 1,
        }
    }
}

/// External collaborators of a controller
#[derive(Clone)]
pub struct Services {
    pub engines: Arc<dyn EngineFactory>,
    pub backend: Arc<dyn ExtractionBackend>,
    pub subtitles: Arc<dyn SubtitleFetcher>,
    pub progress: Arc<dyn ProgressSink>,
}

// =============================================================================
// Controller
// =============================================================================

/// The attachment currently owning the surface
struct PlaybackSession {
    token: SessionToken,
    adapter: Option<Box<dyn Adapter>>,
    track: Option<Track>,
}

/// Drives source switching, subtitles and progress for one episode view
pub struct LifecycleController {
    view: EpisodeView,
    surface: Box<dyn MediaSurface>,
    deps: AdapterDeps,
    subtitles: Arc<dyn SubtitleFetcher>,
    progress: Arc<dyn ProgressSink>,
    settings: ControllerSettings,
    notices: NoticeBoard,
    tokens: watch::Sender<SessionToken>,
    state: watch::Sender<PlayerState>,
    session: Mutex<PlaybackSession>,
    reporter: StdMutex<ProgressReporter>,
    pending_reports: StdMutex<Vec<JoinHandle<()>>>,
}

impl LifecycleController {
    pub fn new(
        view: EpisodeView,
        surface: Box<dyn MediaSurface>,
        services: Services,
        settings: ControllerSettings,
    ) -> Self {
        let reporter = ProgressReporter::with_settings(
            view.episode_id,
            settings.progress_interval,
            settings.completion_threshold,
        );
        let (tokens, _) = watch::channel(0);
        let (state, _) = watch::channel(PlayerState::Empty);

        Self {
            view,
            surface,
            deps: AdapterDeps {
                engines: services.engines,
                backend: services.backend,
            },
            subtitles: services.subtitles,
            progress: services.progress,
            notices: NoticeBoard::new(settings.notice_ttl),
            settings,
            tokens,
            state,
            session: Mutex::new(PlaybackSession {
                token: 0,
                adapter: None,
                track: None,
            }),
            reporter: StdMutex::new(reporter),
            pending_reports: StdMutex::new(Vec::new()),
        }
    }

    pub fn view(&self) -> &EpisodeView {
        &self.view
    }

    pub fn notices(&self) -> &NoticeBoard {
        &self.notices
    }

    pub fn state(&self) -> PlayerState {
        self.state.borrow().clone()
    }

    /// Follow state changes
    pub fn watch_state(&self) -> watch::Receiver<PlayerState> {
        self.state.subscribe()
    }

    /// Token of the most recent switch or cleanup
    pub fn current_token(&self) -> SessionToken {
        *self.tokens.borrow()
    }

    fn is_current(&self, token: SessionToken) -> bool {
        self.current_token() == token
    }

    fn next_token(&self) -> SessionToken {
        let mut next = 0;
        self.tokens.send_modify(|token| {
            *token += 1;
            next = *token;
        });
        next
    }

    fn set_state(&self, state: PlayerState) {
        tracing::trace!(?state, "player state");
        self.state.send_replace(state);
    }

    fn reporter(&self) -> MutexGuard<'_, ProgressReporter> {
        self.reporter
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn send_report(&self, sample: ProgressSample) {
        let handle = progress::emit_detached(self.progress.clone(), sample);
        let mut pending = self
            .pending_reports
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        pending.retain(|h| !h.is_finished());
        pending.push(handle);
    }

    /// Wait for progress reports still in flight
    ///
    /// Hosts call this before shutting down so the last report is not lost.
    pub async fn flush_reports(&self) {
        let pending = std::mem::take(
            &mut *self
                .pending_reports
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        );
        for handle in pending {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "progress report task failed");
            }
        }
    }

    /// Report a request refused before anything was touched
    fn refuse(&self, err: PlayerError) -> PlayerError {
        tracing::warn!(error = %err, "source switch refused");
        self.notices.error(&err);
        err
    }

    /// Kind of the attached source, if any
    pub async fn active_kind(&self) -> Option<SourceKind> {
        let session = self.session.lock().await;
        session.adapter.as_ref().map(|a| a.kind())
    }

    // -------------------------------------------------------------------------
    // Source switching
    // -------------------------------------------------------------------------

    /// Switch the surface to the source at `index` of the episode view
    pub async fn switch_to(&self, index: usize) -> Result<SessionToken, PlayerError> {
        let Some(source) = self.view.sources.get(index).cloned() else {
            return Err(self.refuse(PlayerError::UnsupportedSource(format!(
                "no source #{} for this episode",
                index
            ))));
        };
        self.switch_source(&source).await
    }

    /// Replace whatever is attached with `source`
    ///
    /// Returns the token events of the new session must carry. A source of
    /// unknown kind is refused up front and the current session stays.
    pub async fn switch_source(&self, source: &SourceDescriptor) -> Result<SessionToken, PlayerError> {
        if source.kind == SourceKind::Unsupported {
            return Err(self.refuse(PlayerError::UnsupportedSource(source.to_string())));
        }

        let token = self.next_token();
        tracing::info!(token, %source, "switching source");
        self.set_state(PlayerState::Detaching);

        let mut session = self.session.lock().await;
        self.teardown(&mut session).await;

        if !self.is_current(token) {
            tracing::debug!(token, "switch superseded during cleanup");
            return Err(PlayerError::Superseded);
        }

        match self.attach_with_policy(&mut session, token, source).await {
            Ok(kind) => {
                session.token = token;
                self.set_state(PlayerState::Attached(kind));
                if !self.view.subtitles.is_empty() {
                    self.surface.set_toggle(UiToggle::SubtitleMenu, true);
                }
                tracing::info!(token, %kind, "source attached");
                Ok(token)
            }
            Err(e) if e.is_superseded() || !self.is_current(token) => {
                tracing::debug!(token, error = %e, "switch superseded during attach");
                Err(PlayerError::Superseded)
            }
            Err(e) => {
                tracing::warn!(token, error = %e, "source failed to attach");
                self.set_state(PlayerState::Error(e.to_string()));
                self.notices.error(&e);
                Err(e)
            }
        }
    }

    /// Attach `source`, applying the extraction retry and fallback policy
    async fn attach_with_policy(
        &self,
        session: &mut PlaybackSession,
        token: SessionToken,
        source: &SourceDescriptor,
    ) -> Result<SourceKind, PlayerError> {
        let mut target = source.clone();
        let mut retries_left = self.settings.extraction_retries;

        loop {
            let err = match self.attach_once(session, token, &target).await {
                Ok(()) => return Ok(target.kind),
                Err(e) => e,
            };

            if err.is_superseded() || target.kind != SourceKind::Extracted {
                return Err(err);
            }

            if err.is_retryable() && retries_left > 0 {
                retries_left -= 1;
                tracing::warn!(error = %err, "extraction failed, retrying");
                continue;
            }

            match self.settings.extraction_fallback {
                ExtractionFallback::FailClosed => return Err(err),
                ExtractionFallback::Embed => {
                    tracing::warn!(error = %err, "extraction failed, falling back to embedded player");
                    self.notices
                        .warn(format!("{}. Showing the embedded player instead.", err));
                    target.kind = SourceKind::Embedded;
                }
            }
        }
    }

    /// One attach attempt; leaves nothing bound unless it succeeds
    async fn attach_once(
        &self,
        session: &mut PlaybackSession,
        token: SessionToken,
        source: &SourceDescriptor,
    ) -> Result<(), PlayerError> {
        self.set_state(PlayerState::Attaching(source.kind));
        let mut adapter = adapter::for_source(source, &self.deps)?;

        let tokens = self.tokens.subscribe();
        let surface = self.surface.as_ref();
        let ctx = AttachContext::new(surface, source, token, &tokens);

        let result = tokio::select! {
            biased;
            _ = superseded(tokens.clone(), token) => Err(PlayerError::Superseded),
            result = adapter.attach(&ctx) => result,
        };

        match result {
            Ok(()) if self.is_current(token) => {
                session.adapter = Some(adapter);
                Ok(())
            }
            Ok(()) => {
                adapter.detach(surface);
                Err(PlayerError::Superseded)
            }
            Err(e) => {
                adapter.detach(surface);
                Err(e)
            }
        }
    }

    /// Detach the adapter and clear everything tied to it
    ///
    /// Returns false when there was nothing to clean up.
    async fn teardown(&self, session: &mut PlaybackSession) -> bool {
        let Some(mut adapter) = session.adapter.take() else {
            return false;
        };

        tracing::debug!(token = session.token, kind = %adapter.kind(), "detaching adapter");
        adapter.detach(self.surface.as_ref());
        drop(adapter);

        self.surface.remove_all_tracks();
        session.track = None;
        for toggle in UiToggle::ALL {
            self.surface.set_toggle(toggle, false);
        }
        self.reporter().reset_session();

        if !self.settings.cleanup_delay.is_zero() {
            tokio::time::sleep(self.settings.cleanup_delay).await;
        }
        true
    }

    /// Tear down the session, e.g. when navigating away
    ///
    /// Voids any switch still in flight. Calling it again is a no-op.
    pub async fn cleanup(&self) {
        let token = self.next_token();
        let mut session = self.session.lock().await;
        if self.teardown(&mut session).await {
            tracing::info!("playback session cleaned up");
        }
        if self.is_current(token) {
            self.set_state(PlayerState::Empty);
        }
    }

    // -------------------------------------------------------------------------
    // Events
    // -------------------------------------------------------------------------

    /// Route a host event to the session it was raised for
    ///
    /// Events from a replaced session, or with nothing attached, are dropped.
    pub async fn dispatch(&self, token: SessionToken, event: SurfaceEvent) {
        if !self.is_current(token) {
            tracing::trace!(token, ?event, "dropping event from stale session");
            return;
        }

        let mut session = self.session.lock().await;
        if session.token != token || session.adapter.is_none() {
            return;
        }

        match &event {
            SurfaceEvent::TimeUpdate { position, duration } => {
                let sample = self.reporter().sample(Instant::now(), *position, *duration);
                if let Some(sample) = sample {
                    self.send_report(sample);
                }
                return;
            }
            SurfaceEvent::Paused => {
                self.reporter().set_paused(true);
                return;
            }
            SurfaceEvent::Playing => {
                self.reporter().set_paused(false);
                return;
            }
            SurfaceEvent::Ended => {
                let sample = self.reporter().finish(Instant::now());
                self.send_report(sample);
                return;
            }
            _ => {}
        }

        let Some(adapter) = session.adapter.as_mut() else {
            return;
        };
        let kind = adapter.kind();

        match adapter.handle_event(self.surface.as_ref(), &event) {
            EventOutcome::Failed(err) => {
                tracing::error!(%kind, error = %err, "attached source failed");
                self.teardown(&mut session).await;
                self.set_state(PlayerState::Error(err.to_string()));
                self.notices.error(&err);
            }
            EventOutcome::Recovered => {
                tracing::info!(%kind, "source recovered from decode error");
            }
            EventOutcome::Handled | EventOutcome::Ignored => {}
        }
    }

    // -------------------------------------------------------------------------
    // Subtitles
    // -------------------------------------------------------------------------

    pub async fn subtitle_state(&self) -> SubtitleState {
        if self.view.subtitles.is_empty() {
            return SubtitleState::Unavailable;
        }
        let session = self.session.lock().await;
        match &session.track {
            Some(track) => SubtitleState::Active(track.language.clone()),
            None => SubtitleState::Off,
        }
    }

    /// Replace the active subtitle track
    ///
    /// Failures are reported to the user; playback is never affected.
    pub async fn select_subtitle(&self, choice: SubtitleChoice) -> Result<(), PlayerError> {
        let result = self.replace_track(choice).await;
        if let Err(e) = &result {
            tracing::warn!(error = %e, "subtitle selection failed");
            self.notices.subtitle_error(e);
        }
        result
    }

    async fn replace_track(&self, choice: SubtitleChoice) -> Result<(), PlayerError> {
        let token = self.current_token();

        let code = match choice {
            SubtitleChoice::Off => {
                let mut session = self.session.lock().await;
                self.surface.remove_all_tracks();
                session.track = None;
                tracing::debug!("subtitles off");
                return Ok(());
            }
            SubtitleChoice::Language(code) => code,
        };

        if self.view.subtitles.is_empty() {
            return Err(PlayerError::NoSubtitles);
        }
        let descriptor = self
            .view
            .subtitle(&code)
            .ok_or_else(|| PlayerError::UnknownSubtitle(code.clone()))?;

        let track = self.load_track(descriptor).await?;

        let mut session = self.session.lock().await;
        if !self.is_current(token) {
            return Err(PlayerError::Superseded);
        }
        if session.adapter.is_none() {
            return Err(PlayerError::NotAttached);
        }

        self.surface.remove_all_tracks();
        self.surface.add_track(&track);
        tracing::info!(language = %track.language, cues = track.len(), "subtitle track active");
        session.track = Some(track);
        Ok(())
    }

    async fn load_track(&self, descriptor: &SubtitleDescriptor) -> Result<Track, PlayerError> {
        let text = self.subtitles.fetch(&descriptor.url).await?;
        let cues = subtitles::parse(&text, descriptor.format)?;
        Ok(Track::new(descriptor.language_code.clone(), cues))
    }

    // -------------------------------------------------------------------------
    // Quality
    // -------------------------------------------------------------------------

    /// Switch the attached progressive source to a declared quality
    pub async fn select_quality(&self, label: &str) -> Result<(), PlayerError> {
        let mut session = self.session.lock().await;
        let result = match session.adapter.as_mut() {
            Some(adapter) => adapter.select_quality(self.surface.as_ref(), label),
            None => Err(PlayerError::NotAttached),
        };
        if let Err(e) = &result {
            self.notices.error(e);
        }
        result
    }
}

/// Resolves once `token` is no longer the current one
async fn superseded(mut tokens: watch::Receiver<SessionToken>, token: SessionToken) {
    loop {
        if *tokens.borrow_and_update() != token {
            return;
        }
        if tokens.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_state_serializes_tagged() {
        let json = serde_json::to_value(PlayerState::Attached(SourceKind::Embedded)).unwrap();
        assert_eq!(json["state"], "attached");
        assert_eq!(json["detail"], "embedded");

        let json = serde_json::to_value(PlayerState::Empty).unwrap();
        assert_eq!(json["state"], "empty");
    }

    #[test]
    fn test_subtitle_state_serializes_tagged() {
        let json = serde_json::to_value(SubtitleState::Active("en".into())).unwrap();
        assert_eq!(json["subtitles"], "active");
        assert_eq!(json["language"], "en");
    }

    #[test]
    fn test_fallback_config_names() {
        let fallback: ExtractionFallback = serde_json::from_str(r#""embed""#).unwrap();
        assert_eq!(fallback, ExtractionFallback::Embed);
        assert_eq!(ExtractionFallback::default(), ExtractionFallback::FailClosed);
    }
}
