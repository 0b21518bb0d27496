//! Extracted-playlist adapter

use async_trait::async_trait;
use std::sync::Arc;

use super::{Adapter, AttachContext, EventOutcome, SegmentedAdapter, HLS_MIME};
use crate::api::backend::ExtractionBackend;
use crate::error::PlayerError;
use crate::models::SourceKind;
use crate::stream::surface::{EngineFactory, MediaSurface, ResourceHandle, SurfaceEvent};

/// Asks the backend for a playlist, then plays it like a segmented source
///
/// The playlist text is served from a fabricated handle that lives exactly
/// as long as the attachment. Every failure is raised; retry and fallback
/// belong to the controller.
pub struct ExtractedAdapter {
    backend: Arc<dyn ExtractionBackend>,
    inner: SegmentedAdapter,
    handle: Option<ResourceHandle>,
}

impl ExtractedAdapter {
    pub fn new(backend: Arc<dyn ExtractionBackend>, engines: Arc<dyn EngineFactory>) -> Self {
        Self {
            backend,
            inner: SegmentedAdapter::new(engines),
            handle: None,
        }
    }

    /// The handle serving the extracted playlist
    pub fn handle(&self) -> Option<&ResourceHandle> {
        self.handle.as_ref()
    }
}

#[async_trait]
impl Adapter for ExtractedAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::Extracted
    }

    async fn attach(&mut self, ctx: &AttachContext<'_>) -> Result<(), PlayerError> {
        let playlist = self.backend.extract(&ctx.source.url).await?;
        if playlist.trim().is_empty() {
            return Err(PlayerError::Extraction("empty playlist".to_string()));
        }

        // Late result of a switch that has since been replaced
        ctx.ensure_current()?;

        let handle = ctx.surface.fabricate_handle(&playlist, HLS_MIME);
        if let Err(e) = self.inner.bind(ctx.surface, ctx.token, handle.as_str()) {
            ctx.surface.revoke_handle(&handle);
            return Err(e);
        }
        tracing::info!(%handle, "extracted playlist attached");
        self.handle = Some(handle);
        Ok(())
    }

    fn detach(&mut self, surface: &dyn MediaSurface) {
        self.inner.detach(surface);
        if let Some(handle) = self.handle.take() {
            surface.revoke_handle(&handle);
        }
    }

    fn handle_event(&mut self, surface: &dyn MediaSurface, event: &SurfaceEvent) -> EventOutcome {
        self.inner.handle_event(surface, event)
    }

    fn is_bound(&self) -> bool {
        self.inner.is_bound() || self.handle.is_some()
    }
}
