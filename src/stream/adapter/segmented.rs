//! Segmented (HLS) adapter

use async_trait::async_trait;
use std::sync::Arc;

use super::{Adapter, AttachContext, EventOutcome, HLS_MIME};
use crate::error::PlayerError;
use crate::models::SourceKind;
use crate::stream::surface::{
    DecodeEngine, EngineFactory, MediaSurface, ResourceHandle, SessionToken, Subscription,
    SurfaceEvent,
};

/// Fatal decode errors absorbed by reloading the manifest
const MAX_FATAL_RESTARTS: u32 = 1;

/// Plays a manifest through the decode engine
///
/// Falls back to native playback when the engine cannot run but the surface
/// understands HLS itself. A descriptor whose url holds playlist text is
/// served from a fabricated handle.
pub struct SegmentedAdapter {
    engines: Arc<dyn EngineFactory>,
    engine: Option<Box<dyn DecodeEngine>>,
    native: bool,
    manifest: Option<String>,
    inline_handle: Option<ResourceHandle>,
    subscription: Option<Subscription>,
    fatal_restarts: u32,
}

impl SegmentedAdapter {
    pub fn new(engines: Arc<dyn EngineFactory>) -> Self {
        Self {
            engines,
            engine: None,
            native: false,
            manifest: None,
            inline_handle: None,
            subscription: None,
            fatal_restarts: 0,
        }
    }

    /// Bind a manifest location to the surface
    ///
    /// Synchronous so callers can run it right after their last await.
    pub(crate) fn bind(
        &mut self,
        surface: &dyn MediaSurface,
        token: SessionToken,
        manifest: &str,
    ) -> Result<(), PlayerError> {
        if self.engines.is_supported() {
            let mut engine = self.engines.create();
            engine.load_source(manifest);
            engine.attach_media(surface);
            self.engine = Some(engine);
        } else if surface.plays_hls_natively() {
            surface.set_source(manifest);
            self.native = true;
        } else {
            return Err(PlayerError::Decode(
                "segmented streaming is not supported on this surface".to_string(),
            ));
        }

        tracing::debug!(native = self.native, token, "segmented source bound");
        self.subscription = Some(surface.subscribe(token));
        self.manifest = Some(manifest.to_string());
        Ok(())
    }

    pub fn restarts(&self) -> u32 {
        self.fatal_restarts
    }

    fn restart_from_manifest(&mut self, surface: &dyn MediaSurface) {
        let Some(manifest) = self.manifest.as_deref() else {
            return;
        };
        if let Some(engine) = self.engine.as_mut() {
            engine.stop_load();
            engine.load_source(manifest);
            engine.start_load();
        } else if self.native {
            let position = surface.position();
            surface.clear_source();
            surface.set_source(manifest);
            surface.seek(position);
        }
    }
}

#[async_trait]
impl Adapter for SegmentedAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::Segmented
    }

    async fn attach(&mut self, ctx: &AttachContext<'_>) -> Result<(), PlayerError> {
        ctx.ensure_current()?;

        if !ctx.source.is_inline_playlist() {
            return self.bind(ctx.surface, ctx.token, &ctx.source.url);
        }

        let handle = ctx.surface.fabricate_handle(&ctx.source.url, HLS_MIME);
        if let Err(e) = self.bind(ctx.surface, ctx.token, handle.as_str()) {
            ctx.surface.revoke_handle(&handle);
            return Err(e);
        }
        self.inline_handle = Some(handle);
        Ok(())
    }

    fn detach(&mut self, surface: &dyn MediaSurface) {
        if let Some(mut engine) = self.engine.take() {
            engine.stop_load();
            engine.detach_media(surface);
            engine.destroy();
        }
        if self.native {
            surface.clear_source();
            self.native = false;
        }
        if let Some(handle) = self.inline_handle.take() {
            surface.revoke_handle(&handle);
        }
        if let Some(subscription) = self.subscription.take() {
            surface.unsubscribe(&subscription);
        }
        self.manifest = None;
        self.fatal_restarts = 0;
    }

    fn handle_event(&mut self, surface: &dyn MediaSurface, event: &SurfaceEvent) -> EventOutcome {
        let SurfaceEvent::DecodeError { fatal, detail } = event else {
            return EventOutcome::Ignored;
        };
        if !self.is_bound() {
            return EventOutcome::Ignored;
        }

        if !fatal {
            tracing::warn!(%detail, "non-fatal decode error, restarting load");
            if let Some(engine) = self.engine.as_mut() {
                engine.start_load();
            }
            return EventOutcome::Recovered;
        }

        if self.fatal_restarts < MAX_FATAL_RESTARTS {
            self.fatal_restarts += 1;
            tracing::warn!(%detail, attempt = self.fatal_restarts, "fatal decode error, reloading manifest");
            self.restart_from_manifest(surface);
            EventOutcome::Recovered
        } else {
            tracing::error!(%detail, "decode failed after manifest reload");
            EventOutcome::Failed(PlayerError::Decode(detail.clone()))
        }
    }

    fn is_bound(&self) -> bool {
        self.engine.is_some() || self.native
    }
}
