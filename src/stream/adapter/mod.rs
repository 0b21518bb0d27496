//! Source adapters
//!
//! Each adapter binds one kind of source to the shared media surface behind
//! the same [`Adapter`] contract:
//! - `segmented`: HLS through the decode engine
//! - `progressive`: direct files with a static quality set
//! - `embedded`: third-party player in a sandboxed frame
//! - `extracted`: backend-extracted playlist served from a local handle
//!
//! Adapters never keep the surface: it is lent to every call by the
//! lifecycle controller, which owns it.

pub mod embedded;
pub mod extracted;
pub mod progressive;
pub mod segmented;

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::watch;

use crate::api::backend::ExtractionBackend;
use crate::error::PlayerError;
use crate::models::{SourceDescriptor, SourceKind};
use crate::stream::surface::{EngineFactory, MediaSurface, SessionToken, SurfaceEvent};

pub use embedded::EmbeddedAdapter;
pub use extracted::ExtractedAdapter;
pub use progressive::ProgressiveAdapter;
pub use segmented::SegmentedAdapter;

/// MIME type used for fabricated playlist handles
pub const HLS_MIME: &str = "application/vnd.apple.mpegurl";

/// What an adapter made of a surface event
#[derive(Debug)]
pub enum EventOutcome {
    /// Not meant for this adapter
    Ignored,
    /// Consumed, nothing else to do
    Handled,
    /// An error was absorbed by an internal restart
    Recovered,
    /// The adapter gave up; the controller must react
    Failed(PlayerError),
}

/// Everything an adapter may use while attaching
pub struct AttachContext<'a> {
    pub surface: &'a dyn MediaSurface,
    pub source: &'a SourceDescriptor,
    pub token: SessionToken,
    tokens: &'a watch::Receiver<SessionToken>,
}

impl<'a> AttachContext<'a> {
    pub fn new(
        surface: &'a dyn MediaSurface,
        source: &'a SourceDescriptor,
        token: SessionToken,
        tokens: &'a watch::Receiver<SessionToken>,
    ) -> Self {
        Self {
            surface,
            source,
            token,
            tokens,
        }
    }

    /// Whether no newer switch has been requested
    pub fn is_current(&self) -> bool {
        *self.tokens.borrow() == self.token
    }

    /// Fail with `Superseded` if a newer switch has been requested
    pub fn ensure_current(&self) -> Result<(), PlayerError> {
        if self.is_current() {
            Ok(())
        } else {
            Err(PlayerError::Superseded)
        }
    }
}

/// Binding between one source kind and the shared surface
#[async_trait]
pub trait Adapter: Send {
    fn kind(&self) -> SourceKind;

    /// Bind the source to the surface
    ///
    /// Every await happens before the first surface side effect, so a
    /// dropped attach future leaves nothing bound.
    async fn attach(&mut self, ctx: &AttachContext<'_>) -> Result<(), PlayerError>;

    /// Release everything bound by `attach`; safe to call more than once
    fn detach(&mut self, surface: &dyn MediaSurface);

    /// React to an event from the surface, engine or embed frame
    fn handle_event(&mut self, surface: &dyn MediaSurface, event: &SurfaceEvent) -> EventOutcome;

    /// Switch to another declared quality
    fn select_quality(
        &mut self,
        _surface: &dyn MediaSurface,
        _label: &str,
    ) -> Result<(), PlayerError> {
        Err(PlayerError::Unsupported {
            kind: self.kind(),
            operation: "Quality selection",
        })
    }

    /// Whether anything is currently bound to the surface
    fn is_bound(&self) -> bool;
}

/// Collaborators adapters are built with
#[derive(Clone)]
pub struct AdapterDeps {
    pub engines: Arc<dyn EngineFactory>,
    pub backend: Arc<dyn ExtractionBackend>,
}

/// Build the adapter variant for a source
pub fn for_source(
    source: &SourceDescriptor,
    deps: &AdapterDeps,
) -> Result<Box<dyn Adapter>, PlayerError> {
    let adapter: Box<dyn Adapter> = match source.kind {
        SourceKind::Segmented => Box::new(SegmentedAdapter::new(deps.engines.clone())),
        SourceKind::Progressive => Box::new(ProgressiveAdapter::new(source.qualities.clone())),
        SourceKind::Embedded => Box::new(EmbeddedAdapter::new()),
        SourceKind::Extracted => Box::new(ExtractedAdapter::new(
            deps.backend.clone(),
            deps.engines.clone(),
        )),
        SourceKind::Unsupported => {
            return Err(PlayerError::UnsupportedSource(source.to_string()));
        }
    };
    Ok(adapter)
}
