//! API clients for external services
//!
//! - Backend: playlist extraction and watch-progress endpoints

pub mod backend;

pub use backend::{BackendClient, ExtractionBackend, ProgressSink, SubtitleFetcher};
