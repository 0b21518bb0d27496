//! Configuration management for aniflix-player
//!
//! Handles config file loading/saving and environment overrides.
//! Config is stored at ~/.config/aniflix-player/config.toml

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::stream::controller::{ControllerSettings, ExtractionFallback};

/// Environment variable overriding the backend URL
pub const BACKEND_URL_ENV: &str = "ANIFLIX_BACKEND_URL";

/// Environment variable overriding the log filter
pub const LOG_ENV: &str = "ANIFLIX_LOG";

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (trace, debug, info, warn, error or an EnvFilter string)
    pub level: String,
    /// "pretty" or "json"
    pub format: String,
    /// Append logs to this file instead of stderr
    pub file_path: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file_path: None,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the site backend
    pub backend_url: String,
    /// Extraction request timeout in seconds
    pub extraction_timeout_secs: u64,
    /// Minimum seconds between two progress reports
    pub progress_interval_secs: u64,
    /// Watched percentage at which an episode counts as completed
    pub completion_threshold: f64,
    /// Pause after detaching a source, in milliseconds
    pub cleanup_delay_ms: u64,
    /// Seconds a notification stays on screen
    pub notice_ttl_secs: u64,
    /// What to do when extraction fails
    pub extraction_fallback: ExtractionFallback,
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:5000".to_string(),
            extraction_timeout_secs: 30,
            progress_interval_secs: 5,
            completion_threshold: 80.0,
            cleanup_delay_ms: 100,
            notice_ttl_secs: 5,
            extraction_fallback: ExtractionFallback::FailClosed,
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Get config file path (~/.config/aniflix-player/config.toml)
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("aniflix-player").join("config.toml"))
    }

    /// Load config from the default path, or return default if not found,
    /// then apply environment overrides
    pub fn load() -> Self {
        let mut config: Self = Self::path()
            .and_then(|p| std::fs::read_to_string(p).ok())
            .and_then(|s| toml::from_str(&s).ok())
            .unwrap_or_default();
        config.apply_env();
        config
    }

    /// Load config from an explicit file; a broken file is an error here
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read config file {}", path.display()))?;
        let mut config: Self = toml::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        config.apply_env();
        Ok(config)
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        let path = Self::path().ok_or_else(|| anyhow::anyhow!("Could not determine config path"))?;

        // Create parent directory if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let toml = toml::to_string_pretty(self)?;
        std::fs::write(path, toml)?;
        Ok(())
    }

    /// Apply environment variable overrides
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(BACKEND_URL_ENV) {
            if !url.trim().is_empty() {
                self.backend_url = url.trim().to_string();
            }
        }
        if let Ok(level) = std::env::var(LOG_ENV) {
            if !level.trim().is_empty() {
                self.logging.level = level.trim().to_string();
            }
        }
    }

    pub fn extraction_timeout(&self) -> Duration {
        Duration::from_secs(self.extraction_timeout_secs)
    }

    /// Settings for a lifecycle controller
    pub fn controller_settings(&self) -> ControllerSettings {
        ControllerSettings {
            cleanup_delay: Duration::from_millis(self.cleanup_delay_ms),
            progress_interval: Duration::from_secs(self.progress_interval_secs),
            completion_threshold: self.completion_threshold.clamp(0.0, 100.0),
            notice_ttl: Duration::from_secs(self.notice_ttl_secs),
            extraction_fallback: self.extraction_fallback,
            ..ControllerSettings::default()
        }
    }
}
