//! Progressive (direct file) adapter

use async_trait::async_trait;

use super::{Adapter, AttachContext, EventOutcome};
use crate::error::PlayerError;
use crate::models::{QualityOption, SourceKind};
use crate::stream::surface::{MediaSurface, Subscription, SurfaceEvent, UiToggle};

/// Plays a file URL directly on the surface
///
/// Quality choices are the ones declared with the source; nothing is
/// negotiated at runtime.
pub struct ProgressiveAdapter {
    qualities: Vec<QualityOption>,
    current: Option<String>,
    subscription: Option<Subscription>,
}

impl ProgressiveAdapter {
    pub fn new(qualities: Vec<QualityOption>) -> Self {
        Self {
            qualities,
            current: None,
            subscription: None,
        }
    }

    /// URL currently playing
    pub fn current_url(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Label of the playing quality, when it is one of the declared ones
    pub fn active_quality(&self) -> Option<&str> {
        let current = self.current.as_deref()?;
        self.qualities
            .iter()
            .find(|q| q.url == current)
            .map(|q| q.label.as_str())
    }
}

#[async_trait]
impl Adapter for ProgressiveAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::Progressive
    }

    async fn attach(&mut self, ctx: &AttachContext<'_>) -> Result<(), PlayerError> {
        ctx.ensure_current()?;

        ctx.surface.set_source(&ctx.source.url);
        if !self.qualities.is_empty() {
            ctx.surface.set_toggle(UiToggle::QualityMenu, true);
        }
        self.current = Some(ctx.source.url.clone());
        self.subscription = Some(ctx.surface.subscribe(ctx.token));
        Ok(())
    }

    fn detach(&mut self, surface: &dyn MediaSurface) {
        if self.current.take().is_some() {
            surface.clear_source();
            surface.set_toggle(UiToggle::QualityMenu, false);
        }
        if let Some(subscription) = self.subscription.take() {
            surface.unsubscribe(&subscription);
        }
    }

    fn handle_event(&mut self, _surface: &dyn MediaSurface, event: &SurfaceEvent) -> EventOutcome {
        match event {
            SurfaceEvent::DecodeError { fatal: true, detail } if self.is_bound() => {
                EventOutcome::Failed(PlayerError::Decode(detail.clone()))
            }
            SurfaceEvent::DecodeError { fatal: false, detail } if self.is_bound() => {
                tracing::debug!(%detail, "ignoring non-fatal media error");
                EventOutcome::Handled
            }
            _ => EventOutcome::Ignored,
        }
    }

    fn select_quality(&mut self, surface: &dyn MediaSurface, label: &str) -> Result<(), PlayerError> {
        if !self.is_bound() {
            return Err(PlayerError::NotAttached);
        }

        let option = self
            .qualities
            .iter()
            .find(|q| q.label.eq_ignore_ascii_case(label))
            .ok_or_else(|| PlayerError::UnknownQuality(label.to_string()))?;

        if self.current.as_deref() == Some(option.url.as_str()) {
            return Ok(());
        }

        let position = surface.position();
        surface.clear_source();
        surface.set_source(&option.url);
        surface.seek(position);
        tracing::info!(quality = %option.label, position, "switched progressive quality");

        self.current = Some(option.url.clone());
        Ok(())
    }

    fn is_bound(&self) -> bool {
        self.current.is_some()
    }
}
