//! Integration tests for aniflix-player
//!
//! Tests are organized by component:
//! - subtitles_test: SRT/VTT/XML normalization and subtitle downloads
//! - backend_test: extraction and watch-progress endpoints (mockito)
//! - controller_test: source switching, supersession, subtitles, progress
//! - cli_test: argument parsing and command handlers

// Note: Each test file is a separate integration test crate
// Tests are run individually by cargo, not via mod.rs
