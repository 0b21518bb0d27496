//! Embedded (third-party frame) adapter

use async_trait::async_trait;

use super::{Adapter, AttachContext, EventOutcome};
use crate::error::PlayerError;
use crate::models::SourceKind;
use crate::stream::surface::{MediaSurface, Subscription, SurfaceEvent, UiToggle};

/// Shows a third-party player in the sandboxed frame
///
/// The frame is opaque: the only signals are its own load and error events,
/// and a failed load is never retried here.
pub struct EmbeddedAdapter {
    url: Option<String>,
    loaded: bool,
    subscription: Option<Subscription>,
}

impl EmbeddedAdapter {
    pub fn new() -> Self {
        Self {
            url: None,
            loaded: false,
            subscription: None,
        }
    }

    /// Whether the frame reported a successful load
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }
}

impl Default for EmbeddedAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Adapter for EmbeddedAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::Embedded
    }

    async fn attach(&mut self, ctx: &AttachContext<'_>) -> Result<(), PlayerError> {
        ctx.ensure_current()?;

        ctx.surface.set_toggle(UiToggle::EmbedFrame, true);
        ctx.surface.show_embed(&ctx.source.url);
        self.url = Some(ctx.source.url.clone());
        self.loaded = false;
        self.subscription = Some(ctx.surface.subscribe(ctx.token));
        Ok(())
    }

    fn detach(&mut self, surface: &dyn MediaSurface) {
        if self.url.take().is_some() {
            surface.hide_embed();
            surface.set_toggle(UiToggle::EmbedFrame, false);
        }
        if let Some(subscription) = self.subscription.take() {
            surface.unsubscribe(&subscription);
        }
        self.loaded = false;
    }

    fn handle_event(&mut self, _surface: &dyn MediaSurface, event: &SurfaceEvent) -> EventOutcome {
        if !self.is_bound() {
            return EventOutcome::Ignored;
        }
        match event {
            SurfaceEvent::EmbedLoaded => {
                self.loaded = true;
                EventOutcome::Handled
            }
            SurfaceEvent::EmbedFailed { detail } => {
                tracing::warn!(%detail, "embedded player failed to load");
                EventOutcome::Failed(PlayerError::EmbedFailed(detail.clone()))
            }
            _ => EventOutcome::Ignored,
        }
    }

    fn is_bound(&self) -> bool {
        self.url.is_some()
    }
}
